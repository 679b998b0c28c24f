#![cfg(feature = "web")]
use crate::aggregate::{FixationPath, MapAverage, UserAverage};
use plotters::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

/// Series names used on the per-user chart
pub const COLOR_SERIES: &str = "Farbig";
pub const GRAY_SERIES: &str = "Graustufen";
/// Series name used on the per-map chart
pub const MAP_SERIES: &str = "Average Looking Time per user";

/// Configuration options for rendering a bar chart
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: String::new(),
            y_label: "Fixation duration (ms)".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// A chart description in the shape Plotly expects: traces plus layout
///
/// This is what the JSON API returns; the same aggregates are also rendered
/// to PNG by the `render_*` functions below.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar {
        x: Vec<String>,
        y: Vec<f64>,
        name: String,
    },
    Scatter {
        x: Vec<f64>,
        y: Vec<f64>,
        mode: String,
        name: String,
        marker: Marker,
    },
    Image {
        source: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub size: Vec<f64>,
    pub colorscale: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Axis {
    pub autorange: String,
}

impl Figure {
    /// Stimulus image with the fixation sequence on top, or the error image
    ///
    /// `image_url` maps an image file to the URL the browser loads it from.
    pub fn fixation_path(path: &FixationPath, image_url: impl Fn(&Path) -> String) -> Self {
        let mut data = vec![Trace::Image {
            source: image_url(path.image()),
        }];

        if let FixationPath::Overlay { points, .. } = path {
            data.push(Trace::Scatter {
                x: points.iter().map(|p| p.x).collect(),
                y: points.iter().map(|p| p.y).collect(),
                mode: "lines+markers".to_string(),
                name: "Fixations".to_string(),
                marker: Marker {
                    size: points.iter().map(|p| p.marker_size).collect(),
                    colorscale: "Viridis".to_string(),
                },
            });
        }

        Figure {
            data,
            layout: Layout {
                title: None,
                // image rows grow downwards
                yaxis: Some(Axis {
                    autorange: "reversed".to_string(),
                }),
            },
        }
    }

    pub fn user_average(avg: &UserAverage) -> Self {
        Figure {
            data: vec![
                Trace::Bar {
                    x: avg.labels.clone(),
                    y: avg.color.clone(),
                    name: COLOR_SERIES.to_string(),
                },
                Trace::Bar {
                    x: avg.gray_labels.clone(),
                    y: avg.gray.clone(),
                    name: GRAY_SERIES.to_string(),
                },
            ],
            layout: Layout {
                title: Some(user_average_title(&avg.user)),
                yaxis: None,
            },
        }
    }

    pub fn map_average(avg: &MapAverage) -> Self {
        Figure {
            data: vec![Trace::Bar {
                x: avg.labels.clone(),
                y: avg.means.clone(),
                name: MAP_SERIES.to_string(),
            }],
            layout: Layout {
                title: Some(map_average_title(&avg.map)),
                yaxis: None,
            },
        }
    }
}

pub fn user_average_title(user: &str) -> String {
    format!("Average looking time (ms) per user on {}", user)
}

pub fn map_average_title(map: &str) -> String {
    format!("Average looking time per user on {}", map)
}

/// One named series of a bar chart, keyed by category label
struct BarSeries<'a> {
    name: &'a str,
    labels: &'a [String],
    values: &'a [f64],
    color: RGBColor,
}

/// Render the per-user chart: color and gray bars side by side per stimulus
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn render_user_average(
    avg: &UserAverage,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let options = GraphOptions {
        title: user_average_title(&avg.user),
        x_label: "Stimulus".to_string(),
        width,
        height,
        ..GraphOptions::default()
    };
    render_grouped_bars(
        &[
            BarSeries {
                name: COLOR_SERIES,
                labels: &avg.labels,
                values: &avg.color,
                color: RGBColor(31, 119, 180),
            },
            BarSeries {
                name: GRAY_SERIES,
                labels: &avg.gray_labels,
                values: &avg.gray,
                color: RGBColor(127, 127, 127),
            },
        ],
        &options,
    )
}

/// Render the per-map chart: one bar per user
pub fn render_map_average(
    avg: &MapAverage,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let options = GraphOptions {
        title: map_average_title(&avg.map),
        x_label: "User".to_string(),
        width,
        height,
        ..GraphOptions::default()
    };
    render_grouped_bars(
        &[BarSeries {
            name: MAP_SERIES,
            labels: &avg.labels,
            values: &avg.means,
            color: RGBColor(31, 119, 180),
        }],
        &options,
    )
}

/// Draw bars for several series sharing one category axis
///
/// Categories are the union of all series labels in first-seen order; each
/// category gets one slot per series, so a series missing a category leaves
/// a gap instead of shifting its other bars.
fn render_grouped_bars(
    series: &[BarSeries],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut categories: Vec<&str> = Vec::new();
    for s in series {
        for label in s.labels {
            if !categories.contains(&label.as_str()) {
                categories.push(label);
            }
        }
    }

    let slots = series.len().max(1) as i32;
    let slot_count = (categories.len() as i32 * slots).max(1);
    let max_y = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max);
    let y_top = if max_y > 0.0 { max_y * 1.1 } else { 1.0 };

    let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d((0..slot_count).into_segmented(), 0.0..y_top)?;

        let label_of = |v: &SegmentValue<i32>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) if i % slots == 0 => categories
                .get((i / slots) as usize)
                .map(|c| c.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slot_count as usize)
            .x_label_formatter(&label_of)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        for (s_index, s) in series.iter().enumerate() {
            let color = s.color;
            let bars = s.labels.iter().zip(s.values.iter()).filter_map(|(label, &value)| {
                let c = categories.iter().position(|c| *c == label.as_str())? as i32;
                let slot = c * slots + s_index as i32;
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(slot), 0.0),
                        (SegmentValue::Exact(slot + 1), value),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, 2, 2);
                Some(bar)
            });

            chart
                .draw_series(bars)?
                .label(s.name)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
    }

    encode_png(buffer, options.width, options.height)
}

/// Render a fixation path: the stimulus image with its fixations on top
///
/// Placeholders render the error image unchanged. Points are drawn in pixel
/// coordinates of the image, joined in sequence, each marker's diameter
/// being its scaled duration.
pub fn render_fixation_path(path: &FixationPath) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let background = image::open(path.image())?.to_rgb8();
    let (width, height) = background.dimensions();
    let mut buffer = background.into_raw();

    if let FixationPath::Overlay { points, .. } = path {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();

        let coords: Vec<(i32, i32)> = points
            .iter()
            .map(|p| (p.x.round() as i32, p.y.round() as i32))
            .collect();
        root.draw(&PathElement::new(coords.clone(), BLACK.mix(0.6).stroke_width(2)))?;

        let last = points.len().saturating_sub(1).max(1) as f64;
        for (i, (p, &xy)) in points.iter().zip(coords.iter()).enumerate() {
            let radius = ((p.marker_size / 2.0).round() as i32).max(1);
            // purple for the first fixation through to yellow for the last
            let t = i as f64 / last;
            let fill = HSLColor(0.75 - 0.6 * t, 0.8, 0.45).mix(0.7);
            root.draw(&Circle::new(xy, radius, fill.filled()))?;
        }

        root.present()?;
    }

    encode_png(buffer, width, height)
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let img = image::RgbImage::from_raw(width, height, buffer)
        .ok_or("Rendered buffer does not match image size")?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img).write_to(&mut out, image::ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FixationPoint;
    use std::path::PathBuf;

    fn write_image(path: &Path, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 200, 200]))
            .save(path)
            .unwrap();
    }

    fn overlay(image: PathBuf) -> FixationPath {
        FixationPath::Overlay {
            map: "01_Antwerpen_S1.png".to_string(),
            image,
            points: vec![
                FixationPoint {
                    x: 10.0,
                    y: 12.0,
                    duration: 250.0,
                    marker_size: 25.0,
                },
                FixationPoint {
                    x: 40.0,
                    y: 30.0,
                    duration: 120.0,
                    marker_size: 12.0,
                },
            ],
        }
    }

    #[test]
    fn path_figure_has_image_and_scatter() {
        let fig = Figure::fixation_path(&overlay(PathBuf::from("stimuli/a.png")), |p| {
            format!("/img/{}", p.display())
        });

        assert_eq!(fig.data.len(), 2);
        assert_eq!(
            fig.data[0],
            Trace::Image {
                source: "/img/stimuli/a.png".to_string()
            }
        );
        match &fig.data[1] {
            Trace::Scatter { x, marker, mode, .. } => {
                assert_eq!(x, &vec![10.0, 40.0]);
                assert_eq!(marker.size, vec![25.0, 12.0]);
                assert_eq!(mode, "lines+markers");
            }
            other => panic!("expected scatter trace, got {:?}", other),
        }
    }

    #[test]
    fn placeholder_figure_is_image_only() {
        let path = FixationPath::Placeholder {
            image: PathBuf::from("data/error.png"),
        };
        let fig = Figure::fixation_path(&path, |_| "/assets/error.png".to_string());
        assert_eq!(
            fig.data,
            vec![Trace::Image {
                source: "/assets/error.png".to_string()
            }]
        );
    }

    #[test]
    fn bar_figures_serialize_like_plotly() {
        let avg = MapAverage {
            map: "02_Berlin_S1.jpg".to_string(),
            labels: vec!["u3".to_string(), "u1".to_string()],
            means: vec![120.0, 80.5],
        };
        let json = serde_json::to_value(Figure::map_average(&avg)).unwrap();
        assert_eq!(json["data"][0]["type"], "bar");
        assert_eq!(json["data"][0]["x"], serde_json::json!(["u3", "u1"]));
        assert_eq!(json["data"][0]["name"], MAP_SERIES);
        assert_eq!(
            json["layout"]["title"],
            "Average looking time per user on 02_Berlin_S1.jpg"
        );
        assert!(json["layout"].get("yaxis").is_none());

        let avg = UserAverage {
            user: "u1".to_string(),
            labels: vec!["Antwerpen".to_string()],
            color: vec![300.0],
            gray_labels: Vec::new(),
            gray: Vec::new(),
        };
        let fig = Figure::user_average(&avg);
        assert_eq!(fig.data.len(), 2);
        assert_eq!(
            fig.layout.title.as_deref(),
            Some("Average looking time (ms) per user on u1")
        );
    }

    #[test]
    fn renders_overlay_at_image_size() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("stimulus.png");
        write_image(&image_path, 64, 48);

        let png = render_fixation_path(&overlay(image_path)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));

        // the first marker covers its own centre
        let pixel = decoded.to_rgb8().get_pixel(10, 12).0;
        assert_ne!(pixel, [200, 200, 200]);
    }

    #[test]
    fn renders_user_average_with_matched_and_unmatched_gray() {
        let avg = UserAverage {
            user: "u2".to_string(),
            labels: vec!["Antwerpen".to_string(), "Berlin".to_string()],
            color: vec![300.0, 50.0],
            gray_labels: vec!["Antwerpen".to_string(), "_Zuerich".to_string()],
            gray: vec![600.0, 30.0],
        };
        let png = render_user_average(&avg, 640, 400).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (640, 400));

        let has = |rgb: [u8; 3]| decoded.pixels().any(|p| p.0 == rgb);
        assert!(has([31, 119, 180]));
        assert!(has([127, 127, 127]));
    }

    #[test]
    fn renders_empty_map_average() {
        let avg = MapAverage {
            map: "99_Nowhere_S1.jpg".to_string(),
            labels: Vec::new(),
            means: Vec::new(),
        };
        let png = render_map_average(&avg, 320, 240).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[test]
    fn missing_image_is_an_error() {
        let path = FixationPath::Placeholder {
            image: PathBuf::from("definitely/not/here.png"),
        };
        assert!(render_fixation_path(&path).is_err());
    }
}
