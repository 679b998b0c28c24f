/*!
# Eyetracking Dashboard

A browser-based dashboard for the fixation data of an eyetracking study, built in Rust.

## Overview

The study recorded where participants looked on map stimuli, shown either in
color or in grayscale. The dashboard loads the recorded fixations once at
startup and lets the viewer explore them through a handful of charts picked
from dropdowns, with a sidebar to switch between pages.

## Architecture

Data flows one way: loader -> aggregation -> chart -> page.

- **loader**: reads the tab-delimited, Windows-1252 encoded CSV into an
  immutable [`Dataset`] and derives the sorted user and map lists
- **aggregate**: pure queries over the dataset
  - fixation path of one user on one map, drawn over the map image
  - mean looking time per stimulus for one user, color vs. gray
  - mean looking time per user for one map
- **graph**: Plotly-style figure descriptions and PNG rendering with plotters
- **pages**: the path router and the page layouts it selects
- **app**: the axum server, HTML shell and JSON API
- **config**: fixed paths and rendering settings

## Pages

- `/` - start page
- `/data` - searchable dataset table
- `/map` - average looking time per user on a map
- `/user` - average looking time per stimulus for a user
- `/path` - fixation path of a user on a map
- anything else - not found

## REST API Endpoints

- `/api/page?path=` - page description
- `/api/options` - users and maps for the dropdowns
- `/api/dataset?filter=&offset=&limit=` - dataset rows
- `/api/figure/{path,user,map}` - figure descriptions
- `/chart/{path,user,map}.png` - rendered charts
*/

pub mod aggregate;
#[cfg(feature = "web")]
pub mod app;
pub mod config;
#[cfg(feature = "web")]
pub mod graph;
pub mod loader;
pub mod pages;

/// Re-export the data model and queries to make them easier to use
pub use aggregate::*;
pub use config::*;
pub use loader::*;
pub use pages::*;
