//! Input validation for plotting tools
//!
//! Everything here is pure. A request is checked in a fixed order and the
//! first failure wins:
//!
//! 1. object name
//! 2. characters and syntax
//! 3. variable references
//! 4. domain / range ordering
//! 5. styling
//!
//! Only a request that passes every stage is turned into a plot value that
//! [`crate::geogebra::commands`] can render into an engine command.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::geogebra::session::ViewOptions;

/// Longest expression accepted
pub const MAX_EXPRESSION_LEN: usize = 1000;

/// Longest object name accepted
pub const MAX_NAME_LEN: usize = 64;

/// Parameter used by parametric curves when the caller gives none
pub const DEFAULT_PARAMETER: &str = "t";

/// Inclusive thickness bounds
pub const MIN_THICKNESS: f64 = 1.0;
pub const MAX_THICKNESS: f64 = 10.0;

/// Largest export dimension in pixels
pub const MAX_EXPORT_DIMENSION: u32 = 8192;

/// Functions an expression may call
pub const FUNCTION_NAMES: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "sec", "csc", "cot",
    "sqrt", "cbrt", "exp", "ln", "log", "lg", "ld", "abs", "sgn", "floor", "ceil", "round",
];

/// Named constants an expression may use
pub const CONSTANTS: &[&str] = &["pi", "e"];

/// Operators and punctuation accepted besides letters, digits and spaces
const OPERATOR_CHARS: &[char] = &['+', '-', '*', '/', '^', '(', ')', '.', ','];

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("hex color pattern compiles")
});

static OBJECT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("object name pattern compiles"));

/// Why a request was rejected. `Display` is the message sent to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    Name(String),

    #[error("Invalid expression: {0}")]
    Expression(String),

    /// Parametric curves report both components under one plural heading
    #[error("Invalid expressions: {0}")]
    Expressions(String),

    #[error("Invalid domain: {0}")]
    Domain(String),

    #[error("Invalid styling: {0}")]
    Styling(String),

    #[error("Invalid view: {0}")]
    View(String),
}

/// Accept/reject verdict; `Ok` carries the normalized value
pub type ValidationOutcome<T> = std::result::Result<T, ValidationError>;

// ==================== Styling ====================

/// Line styles the engine supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    pub const NAMES: &'static [&'static str] = &["solid", "dashed", "dotted"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "solid" => Some(LineStyle::Solid),
            "dashed" => Some(LineStyle::Dashed),
            "dotted" => Some(LineStyle::Dotted),
            _ => None,
        }
    }

    /// Numeric code understood by `SetLineStyle`
    pub fn code(self) -> u8 {
        match self {
            LineStyle::Solid => 0,
            LineStyle::Dashed => 1,
            LineStyle::Dotted => 3,
        }
    }
}

fn validate_line_style(style: &str) -> Result<(), validator::ValidationError> {
    if LineStyle::parse(style).is_some() {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("line_style");
        err.message = Some(
            format!(
                "style must be one of {} (got '{}')",
                LineStyle::NAMES.join(", "),
                style
            )
            .into(),
        );
        Err(err)
    }
}

/// Optional styling shared by all plotting tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlotStyling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(regex(path = "HEX_COLOR", message = "color must be a hex value such as #FF0000"))]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1.0, max = 10.0, message = "thickness must be between 1 and 10"))]
    pub thickness: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_line_style")]
    pub style: Option<String>,
}

impl PlotStyling {
    pub fn line_style(&self) -> Option<LineStyle> {
        self.style.as_deref().and_then(LineStyle::parse)
    }

    /// Round thickness to the whole number the engine applies (halves round
    /// away from zero). Only called after [`validate_styling`] passed, so the
    /// result stays within 1..=10.
    pub fn normalized(mut self) -> Self {
        self.thickness = self.thickness.map(f64::round);
        self
    }
}

/// Check styling, reporting every offending field in one message
pub fn validate_styling(styling: &PlotStyling) -> ValidationOutcome<()> {
    let Err(errors) = styling.validate() else {
        return Ok(());
    };

    // field_errors() is a HashMap; sort for a stable message
    let fields: BTreeMap<_, _> = errors.field_errors().into_iter().collect();
    let reasons: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();

    Err(ValidationError::Styling(reasons.join("; ")))
}

// ==================== Expressions ====================

/// Closed interval for an independent variable; always `min < max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

/// Character and bracket check shared by every expression family
fn check_syntax(expression: &str) -> Result<(), String> {
    if expression.is_empty() {
        return Err("expression must not be empty".to_string());
    }
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(format!(
            "expression exceeds {} characters",
            MAX_EXPRESSION_LEN
        ));
    }

    // Only a plain space: line breaks would split the engine command
    let allowed = |c: &char| c.is_ascii_alphanumeric() || *c == ' ' || OPERATOR_CHARS.contains(c);
    if let Some(bad) = expression.chars().find(|c| !allowed(c)) {
        return Err(format!("unsupported character '{}'", bad.escape_default()));
    }

    let mut depth: i32 = 0;
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced parentheses".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses".to_string());
    }

    Ok(())
}

/// Identifiers in an already syntax-checked (ASCII-only) expression, with
/// the byte offset just past each one
fn identifiers(expression: &str) -> Vec<(&str, usize)> {
    let bytes = expression.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_alphabetic() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            found.push((&expression[start..i], i));
        } else {
            i += 1;
        }
    }

    found
}

/// Check every identifier is a known function, a constant, or one of
/// `variables`. Returns the variables actually referenced.
fn check_references<'a>(expression: &'a str, variables: &[&str]) -> Result<Vec<&'a str>, String> {
    let mut referenced: Vec<&str> = Vec::new();

    for (ident, end) in identifiers(expression) {
        if variables.contains(&ident) {
            if !referenced.contains(&ident) {
                referenced.push(ident);
            }
        } else if FUNCTION_NAMES.contains(&ident) {
            let next = expression[end..].trim_start().chars().next();
            if next != Some('(') {
                return Err(format!("function '{}' must be followed by '('", ident));
            }
        } else if !CONSTANTS.contains(&ident) {
            return Err(format!(
                "unknown variable '{}' (allowed: {})",
                ident,
                variables.join(", ")
            ));
        }
    }

    Ok(referenced)
}

/// Object names become engine identifiers, so they follow identifier rules
pub fn validate_name(name: &str) -> ValidationOutcome<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Name("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::Name(format!(
            "name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }
    if !OBJECT_NAME.is_match(name) {
        return Err(ValidationError::Name(format!(
            "'{}' must start with a letter and contain only letters, digits and underscores",
            name
        )));
    }
    if ["x", "y"].contains(&name) || FUNCTION_NAMES.contains(&name) || CONSTANTS.contains(&name) {
        return Err(ValidationError::Name(format!("'{}' is a reserved name", name)));
    }

    Ok(name.to_string())
}

/// Expression of a standard function of `x`
pub fn validate_function_expression(expression: &str) -> ValidationOutcome<String> {
    let expression = expression.trim();
    check_syntax(expression).map_err(ValidationError::Expression)?;
    check_references(expression, &["x"]).map_err(ValidationError::Expression)?;
    Ok(expression.to_string())
}

/// Optional `xMin`/`xMax` pair. Both or neither must be given.
pub fn validate_domain(
    x_min: Option<f64>,
    x_max: Option<f64>,
) -> ValidationOutcome<Option<Interval>> {
    match (x_min, x_max) {
        (None, None) => Ok(None),
        (Some(min), Some(max)) => ordered_interval(min, max, "xMin", "xMax").map(Some),
        _ => Err(ValidationError::Domain(
            "xMin and xMax must be provided together".to_string(),
        )),
    }
}

/// Required `tMin`/`tMax` pair of a parametric curve
pub fn validate_range(t_min: f64, t_max: f64) -> ValidationOutcome<Interval> {
    ordered_interval(t_min, t_max, "tMin", "tMax")
}

fn ordered_interval(
    min: f64,
    max: f64,
    min_label: &str,
    max_label: &str,
) -> ValidationOutcome<Interval> {
    if !min.is_finite() || !max.is_finite() {
        return Err(ValidationError::Domain(format!(
            "{} and {} must be finite numbers",
            min_label, max_label
        )));
    }
    if min >= max {
        return Err(ValidationError::Domain(format!(
            "{} ({}) must be less than {} ({})",
            min_label, min, max_label, max
        )));
    }
    Ok(Interval { min, max })
}

/// Parameter name of a parametric curve
pub fn validate_parameter(parameter: Option<&str>) -> ValidationOutcome<String> {
    let parameter = parameter.map(str::trim).unwrap_or(DEFAULT_PARAMETER);

    let plain = !parameter.is_empty() && parameter.chars().all(|c| c.is_ascii_alphabetic());
    if !plain || FUNCTION_NAMES.contains(&parameter) || CONSTANTS.contains(&parameter) {
        return Err(ValidationError::Expressions(format!(
            "parameter '{}' must be a plain variable name",
            parameter
        )));
    }

    Ok(parameter.to_string())
}

/// Both components of a parametric curve. Characters are checked for both
/// before variable references are checked for either.
pub fn validate_parametric_expressions(
    x_expression: &str,
    y_expression: &str,
    parameter: &str,
) -> ValidationOutcome<(String, String)> {
    let components = [("xExpression", x_expression.trim()), ("yExpression", y_expression.trim())];

    for (label, expression) in components {
        check_syntax(expression)
            .map_err(|reason| ValidationError::Expressions(format!("{}: {}", label, reason)))?;
    }

    for (label, expression) in components {
        check_references(expression, &[parameter]).map_err(|reason| {
            ValidationError::Expressions(format!(
                "{}: {}; both components may only use the parameter '{}'",
                label, reason, parameter
            ))
        })?;
    }

    Ok((components[0].1.to_string(), components[1].1.to_string()))
}

/// Expression of an implicit curve in `x` and `y`
pub fn validate_implicit_expression(expression: &str) -> ValidationOutcome<String> {
    let expression = expression.trim();
    check_syntax(expression).map_err(ValidationError::Expression)?;

    let referenced =
        check_references(expression, &["x", "y"]).map_err(ValidationError::Expression)?;
    if !(referenced.contains(&"x") && referenced.contains(&"y")) {
        return Err(ValidationError::Expression(
            "implicit curves must contain both x and y variables".to_string(),
        ));
    }

    Ok(expression.to_string())
}

/// Export viewport bounds and dimensions
pub fn validate_view(view: &ViewOptions) -> ValidationOutcome<()> {
    for (min, max, axis) in [(view.xmin, view.xmax, "x"), (view.ymin, view.ymax, "y")] {
        if let (Some(min), Some(max)) = (min, max) {
            if !(min < max) {
                return Err(ValidationError::View(format!(
                    "{axis}min ({min}) must be less than {axis}max ({max})"
                )));
            }
        }
    }

    for (size, label) in [(view.width, "width"), (view.height, "height")] {
        if let Some(size) = size {
            if size == 0 || size > MAX_EXPORT_DIMENSION {
                return Err(ValidationError::View(format!(
                    "{} must be between 1 and {} pixels",
                    label, MAX_EXPORT_DIMENSION
                )));
            }
        }
    }

    if let Some(scale) = view.scale {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ValidationError::View("scale must be a positive number".to_string()));
        }
    }

    Ok(())
}

// ==================== Plot requests ====================

/// Arguments of `geogebra_plot_function`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionPlotRequest {
    pub name: String,
    pub expression: String,
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    #[serde(flatten)]
    pub styling: PlotStyling,
}

/// A function plot that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPlot {
    pub name: String,
    pub expression: String,
    pub domain: Option<Interval>,
    pub styling: PlotStyling,
}

/// Arguments of `geogebra_plot_parametric`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParametricPlotRequest {
    pub name: String,
    pub x_expression: String,
    pub y_expression: String,
    pub parameter: Option<String>,
    pub t_min: f64,
    pub t_max: f64,
    #[serde(flatten)]
    pub styling: PlotStyling,
}

/// A parametric curve that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricPlot {
    pub name: String,
    pub x_expression: String,
    pub y_expression: String,
    pub parameter: String,
    pub range: Interval,
    pub styling: PlotStyling,
}

/// Arguments of `geogebra_plot_implicit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitPlotRequest {
    pub name: String,
    pub expression: String,
    #[serde(flatten)]
    pub styling: PlotStyling,
}

/// An implicit curve that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitPlot {
    pub name: String,
    pub expression: String,
    pub styling: PlotStyling,
}

pub fn validate_function_plot(request: FunctionPlotRequest) -> ValidationOutcome<FunctionPlot> {
    let name = validate_name(&request.name)?;
    let expression = validate_function_expression(&request.expression)?;
    let domain = validate_domain(request.x_min, request.x_max)?;
    validate_styling(&request.styling)?;

    Ok(FunctionPlot {
        name,
        expression,
        domain,
        styling: request.styling.normalized(),
    })
}

pub fn validate_parametric_plot(
    request: ParametricPlotRequest,
) -> ValidationOutcome<ParametricPlot> {
    let name = validate_name(&request.name)?;
    let parameter = validate_parameter(request.parameter.as_deref())?;
    let (x_expression, y_expression) =
        validate_parametric_expressions(&request.x_expression, &request.y_expression, &parameter)?;
    let range = validate_range(request.t_min, request.t_max)?;
    validate_styling(&request.styling)?;

    Ok(ParametricPlot {
        name,
        x_expression,
        y_expression,
        parameter,
        range,
        styling: request.styling.normalized(),
    })
}

pub fn validate_implicit_plot(request: ImplicitPlotRequest) -> ValidationOutcome<ImplicitPlot> {
    let name = validate_name(&request.name)?;
    let expression = validate_implicit_expression(&request.expression)?;
    validate_styling(&request.styling)?;

    Ok(ImplicitPlot {
        name,
        expression,
        styling: request.styling.normalized(),
    })
}
