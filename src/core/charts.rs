//! Minimal plotly.js figure model rendered into standalone HTML pages.

use crate::utils::error::Result;
use serde::Serialize;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Text(String),
    Number(f64),
}

impl From<&str> for AxisValue {
    fn from(value: &str) -> Self {
        AxisValue::Text(value.to_string())
    }
}

impl From<String> for AxisValue {
    fn from(value: String) -> Self {
        AxisValue::Text(value)
    }
}

impl From<f64> for AxisValue {
    fn from(value: f64) -> Self {
        AxisValue::Number(value)
    }
}

impl From<u64> for AxisValue {
    fn from(value: u64) -> Self {
        AxisValue::Number(value as f64)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<AxisValue>,
    pub y: Vec<AxisValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<&'static str>,
}

impl Trace {
    fn new(kind: &'static str, x: Vec<AxisValue>, y: Vec<AxisValue>) -> Self {
        Self {
            kind,
            name: None,
            x,
            y,
            orientation: None,
            mode: None,
            text: None,
            textposition: None,
            marker: None,
            line: None,
            showlegend: None,
            xaxis: None,
            yaxis: None,
        }
    }

    pub fn bar(x: Vec<AxisValue>, y: Vec<AxisValue>) -> Self {
        Self::new("bar", x, y)
    }

    /// Bars drawn left to right; `categories` go on the y axis.
    pub fn horizontal_bar(values: Vec<AxisValue>, categories: Vec<AxisValue>) -> Self {
        let mut trace = Self::new("bar", values, categories);
        trace.orientation = Some("h");
        trace
    }

    pub fn line(x: Vec<AxisValue>, y: Vec<AxisValue>) -> Self {
        let mut trace = Self::new("scatter", x, y);
        trace.mode = Some("lines");
        trace
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn colored(mut self, color: &str) -> Self {
        if self.kind == "scatter" {
            self.line = Some(Line {
                color: Some(color.to_string()),
            });
        } else {
            self.marker = Some(Marker {
                color: Some(color.to_string()),
            });
        }
        self
    }

    /// Labels drawn outside the bar ends.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.text = Some(labels);
        self.textposition = Some("outside");
        self
    }

    pub fn on_axes(mut self, xaxis: &'static str, yaxis: &'static str) -> Self {
        self.xaxis = Some(xaxis);
        self.yaxis = Some(yaxis);
        self
    }

    pub fn hide_legend(mut self) -> Self {
        self.showlegend = Some(false);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Title {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showticklabels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoryorder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoryarray: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<&'static str>,
}

impl Axis {
    pub fn titled(text: &str) -> Self {
        Self {
            title: Some(Title {
                text: text.to_string(),
                x: None,
            }),
            ..Self::default()
        }
    }

    pub fn log(mut self) -> Self {
        self.kind = Some("log");
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xref: &'static str,
    pub yref: &'static str,
    pub showarrow: bool,
    pub xanchor: &'static str,
    pub yanchor: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: Title,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Layout {
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            title: Title {
                text: title.to_string(),
                x: None,
            },
            width,
            height,
            barmode: None,
            showlegend: None,
            xaxis: None,
            yaxis: None,
            xaxis2: None,
            yaxis2: None,
            annotations: Vec::new(),
        }
    }

    pub fn centered_title(mut self) -> Self {
        self.title.x = Some(0.5);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(layout: Layout) -> Self {
        Self {
            data: Vec::new(),
            layout,
        }
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.data.push(trace);
    }

    /// Splits the figure into two side-by-side panels with their own titles.
    pub fn with_two_panels(mut self, left_title: &str, right_title: &str) -> Self {
        self.layout.xaxis = Some(Axis {
            domain: Some([0.0, 0.45]),
            anchor: Some("y"),
            ..Axis::default()
        });
        self.layout.xaxis2 = Some(Axis {
            domain: Some([0.55, 1.0]),
            anchor: Some("y2"),
            ..Axis::default()
        });
        self.layout.yaxis = Some(Axis {
            anchor: Some("x"),
            ..Axis::default()
        });
        self.layout.yaxis2 = Some(Axis {
            anchor: Some("x2"),
            ..Axis::default()
        });
        self.layout.annotations = [(left_title, 0.225), (right_title, 0.775)]
            .into_iter()
            .map(|(text, x)| Annotation {
                text: text.to_string(),
                x,
                y: 1.0,
                xref: "paper",
                yref: "paper",
                showarrow: false,
                xanchor: "center",
                yanchor: "bottom",
            })
            .collect();
        self
    }

    pub fn to_html(&self) -> Result<String> {
        let data = script_safe(&serde_json::to_string(&self.data)?);
        let layout = script_safe(&serde_json::to_string(&self.layout)?);

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="chart" style="width:{width}px;height:{height}px;"></div>
<script>
Plotly.newPlot("chart", {data}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#,
            title = escape_html(&self.layout.title.text),
            cdn = PLOTLY_CDN,
            width = self.layout.width,
            height = self.layout.height,
            data = data,
            layout = layout,
        ))
    }
}

fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
