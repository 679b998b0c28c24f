//! Page layouts and the path router
//!
//! Routing is a pure function from a path string to a closed set of pages.
//! Pages carry no state between navigations: every visit rebuilds the
//! selectors with their first option selected.

use crate::loader::Dataset;
use serde::Serialize;

pub const APP_TITLE: &str = "Dashboard Eyetracking - Fortgeschrittene Programmierung";

/// Every page the dashboard can show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Data,
    Map,
    User,
    Path,
    NotFound,
}

impl Route {
    /// Pages listed in the sidebar, in display order
    pub const NAVIGATION: [Route; 5] = [Route::Home, Route::Data, Route::Map, Route::User, Route::Path];

    /// Resolve a URL path; anything outside the fixed set is `NotFound`
    pub fn from_path(path: &str) -> Self {
        match path {
            "/" => Route::Home,
            "/data" => Route::Data,
            "/map" => Route::Map,
            "/user" => Route::User,
            "/path" => Route::Path,
            _ => Route::NotFound,
        }
    }

    pub fn path(self) -> Option<&'static str> {
        match self {
            Route::Home => Some("/"),
            Route::Data => Some("/data"),
            Route::Map => Some("/map"),
            Route::User => Some("/user"),
            Route::Path => Some("/path"),
            Route::NotFound => None,
        }
    }

    /// Sidebar link text
    pub fn nav_label(self) -> &'static str {
        match self {
            Route::Home => "Startseite",
            Route::Data => "Datensatz",
            Route::Map => "Average Maps",
            Route::User => "Average User",
            Route::Path => "User paths per map",
            Route::NotFound => "",
        }
    }
}

/// Which dataset list a selector draws its options from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    User,
    Map,
}

impl SelectorKind {
    pub fn id(self) -> &'static str {
        match self {
            SelectorKind::User => "user-dropdown",
            SelectorKind::Map => "maps-dropdown",
        }
    }

    /// Query parameter the selected value is sent as
    pub fn param(self) -> &'static str {
        match self {
            SelectorKind::User => "user",
            SelectorKind::Map => "map",
        }
    }
}

/// A dropdown pre-filled from the dataset
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selector {
    pub kind: SelectorKind,
    pub id: &'static str,
    pub label: Option<&'static str>,
    pub options: Vec<String>,
    /// First option, `None` only for an empty list
    pub value: Option<String>,
}

impl Selector {
    fn new(kind: SelectorKind, label: Option<&'static str>, options: &[String]) -> Self {
        Selector {
            kind,
            id: kind.id(),
            label,
            options: options.to_vec(),
            value: options.first().cloned(),
        }
    }
}

/// Charts a page can host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    MapAverage,
    UserAverage,
    FixationPath,
}

impl ChartKind {
    /// Element id of the chart placeholder
    pub fn id(self) -> &'static str {
        match self {
            ChartKind::MapAverage => "maps_average",
            ChartKind::UserAverage => "user_average",
            ChartKind::FixationPath => "user_map_path",
        }
    }

    /// Path segment shared by `/chart/<name>.png` and `/api/figure/<name>`
    pub fn endpoint(self) -> &'static str {
        match self {
            ChartKind::MapAverage => "map",
            ChartKind::UserAverage => "user",
            ChartKind::FixationPath => "path",
        }
    }
}

/// A block of static page text
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Text {
    /// Heading level 1-6, or 0 for a paragraph
    pub level: u8,
    pub text: String,
}

impl Text {
    fn heading(level: u8, text: impl Into<String>) -> Self {
        Text {
            level,
            text: text.into(),
        }
    }

    fn paragraph(text: impl Into<String>) -> Self {
        Text::heading(0, text)
    }
}

/// Description of one page's content region
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page {
    pub route: Route,
    pub title: String,
    pub text: Vec<Text>,
    pub selectors: Vec<Selector>,
    pub chart: Option<ChartKind>,
    /// Whether the page shows the dataset table
    pub table: bool,
}

impl Page {
    fn new(route: Route, title: impl Into<String>) -> Self {
        Page {
            route,
            title: title.into(),
            text: Vec::new(),
            selectors: Vec::new(),
            chart: None,
            table: false,
        }
    }

    /// Build the page for `route`, pre-populating selectors from the dataset
    ///
    /// `path` is only used to echo the unrecognised path on the not-found page.
    pub fn build(route: Route, path: &str, dataset: &Dataset) -> Self {
        match route {
            Route::Home => Page {
                text: vec![
                    Text::heading(2, "Willkommen zum Dashboard von Alex, Ajshe, Drin, Louis und Stephane!"),
                    Text::heading(
                        3,
                        "Dieses Dashboard wurde im Jahr 2022 im Modul Fortgeschrittene Programmiertechniken erstellt.",
                    ),
                    Text::heading(
                        4,
                        "Wir befinden uns im 1. Frühlingssemster des Bachelor Studiengang Computational und Data Science. (2. Semester)",
                    ),
                    Text::paragraph(
                        "Der Datensatz wurde uns von den Dozenten vorgegeben. Es handelt sich um Eyetrackingdaten einer echten Studie.",
                    ),
                ],
                ..Page::new(route, "Startseite - Fortgeschrittene Programmierung")
            },
            Route::Data => Page {
                table: true,
                ..Page::new(route, "Datensatz")
            },
            Route::Map => Page {
                selectors: vec![Selector::new(SelectorKind::Map, None, &dataset.maps)],
                chart: Some(ChartKind::MapAverage),
                ..Page::new(route, "Karte wählen")
            },
            Route::User => Page {
                selectors: vec![Selector::new(SelectorKind::User, None, &dataset.users)],
                chart: Some(ChartKind::UserAverage),
                ..Page::new(route, "User wählen")
            },
            Route::Path => Page {
                selectors: vec![
                    Selector::new(SelectorKind::User, Some("User:"), &dataset.users),
                    Selector::new(SelectorKind::Map, Some("Karte:"), &dataset.maps),
                ],
                chart: Some(ChartKind::FixationPath),
                ..Page::new(route, "User und Karte wählen")
            },
            Route::NotFound => Page {
                text: vec![Text::paragraph(format!(
                    "The pathname {} was not recognised...",
                    path
                ))],
                ..Page::new(route, "404: not found")
            },
        }
    }
}

/// Route `path` and build its page in one step
pub fn page_for(path: &str, dataset: &Dataset) -> Page {
    Page::build(Route::from_path(path), path, dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{Condition, FixationRecord};

    fn dataset() -> Dataset {
        let record = |user: &str, map: &str| FixationRecord {
            user: user.to_string(),
            stimuli_name: map.to_string(),
            description: Condition::Color,
            x: 1.0,
            y: 2.0,
            duration: 100.0,
        };
        Dataset::from_records(vec![
            record("u10", "02_Berlin_S1.jpg"),
            record("u2", "01_Antwerpen_S1.jpg"),
        ])
    }

    #[test]
    fn fixed_paths_resolve() {
        assert_eq!(Route::from_path("/"), Route::Home);
        assert_eq!(Route::from_path("/data"), Route::Data);
        assert_eq!(Route::from_path("/map"), Route::Map);
        assert_eq!(Route::from_path("/user"), Route::User);
        assert_eq!(Route::from_path("/path"), Route::Path);
        for route in Route::NAVIGATION {
            assert_eq!(Route::from_path(route.path().unwrap()), route);
        }
    }

    #[test]
    fn anything_else_is_not_found() {
        for path in ["/unknown-xyz", "", "/data/", "/MAP", "//", "/path?user=u1", "data"] {
            assert_eq!(Route::from_path(path), Route::NotFound, "{}", path);
        }
    }

    #[test]
    fn not_found_page_echoes_path() {
        let page = page_for("/unknown-xyz", &dataset());
        assert_eq!(page.route, Route::NotFound);
        assert!(page.text[0].text.contains("/unknown-xyz"));
        assert!(page.selectors.is_empty());
        assert_eq!(page.chart, None);
    }

    #[test]
    fn selectors_default_to_first_option() {
        let page = page_for("/path", &dataset());
        assert_eq!(page.chart, Some(ChartKind::FixationPath));
        assert_eq!(page.selectors.len(), 2);

        let users = &page.selectors[0];
        assert_eq!(users.id, "user-dropdown");
        assert_eq!(users.options, vec!["u2", "u10"]);
        assert_eq!(users.value.as_deref(), Some("u2"));

        let maps = &page.selectors[1];
        assert_eq!(maps.value.as_deref(), Some("01_Antwerpen_S1.jpg"));
    }

    #[test]
    fn single_selector_pages() {
        let data = dataset();
        let map = page_for("/map", &data);
        assert_eq!(map.selectors.len(), 1);
        assert_eq!(map.selectors[0].kind, SelectorKind::Map);
        assert_eq!(map.chart, Some(ChartKind::MapAverage));

        let user = page_for("/user", &data);
        assert_eq!(user.selectors[0].kind, SelectorKind::User);
        assert_eq!(user.chart, Some(ChartKind::UserAverage));

        let table = page_for("/data", &data);
        assert!(table.table);
        assert!(table.selectors.is_empty());

        let home = page_for("/", &data);
        assert_eq!(home.route, Route::Home);
        assert_eq!(home.chart, None);
    }

    #[test]
    fn empty_dataset_has_no_default() {
        let page = page_for("/user", &Dataset::from_records(Vec::new()));
        assert_eq!(page.selectors[0].value, None);
    }
}
