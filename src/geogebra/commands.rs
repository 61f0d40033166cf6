//! Command synthesis
//!
//! Turns validated plots into GeoGebra command strings. These functions are
//! deterministic and never see unvalidated input.

use crate::geogebra::validation::{
    FunctionPlot, ImplicitPlot, Interval, ParametricPlot, PlotStyling,
};

/// Render a number the way it should appear in a command
///
/// `f64`'s `Display` already gives the shortest form that round-trips, so
/// `0.0` becomes `0` and `6.28` stays `6.28`.
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// `f(x) = <expr>` or, with a domain, `f(x) = If(a <= x <= b, <expr>, ?)`
pub fn function_command(plot: &FunctionPlot) -> String {
    match plot.domain {
        None => format!("{}(x) = {}", plot.name, plot.expression),
        Some(Interval { min, max }) => format!(
            "{}(x) = If({} <= x <= {}, {}, ?)",
            plot.name,
            format_number(min),
            format_number(max),
            plot.expression
        ),
    }
}

/// `c = Curve(<xExpr>, <yExpr>, <param>, <tMin>, <tMax>)`
pub fn parametric_command(plot: &ParametricPlot) -> String {
    format!(
        "{} = Curve({}, {}, {}, {}, {})",
        plot.name,
        plot.x_expression,
        plot.y_expression,
        plot.parameter,
        format_number(plot.range.min),
        format_number(plot.range.max)
    )
}

/// `c = ImplicitCurve(<expr>)`
pub fn implicit_command(plot: &ImplicitPlot) -> String {
    format!("{} = ImplicitCurve({})", plot.name, plot.expression)
}

/// Setter commands for whatever styling was supplied, in the order
/// color, thickness, line style
pub fn styling_commands(name: &str, styling: &PlotStyling) -> Vec<String> {
    let mut commands = Vec::new();

    if let Some(color) = &styling.color {
        commands.push(format!("SetColor({}, \"{}\")", name, color));
    }
    // GeoGebra thickness is a whole number
    if let Some(thickness) = styling.thickness {
        commands.push(format!(
            "SetLineThickness({}, {})",
            name,
            format_number(thickness.round())
        ));
    }
    if let Some(style) = styling.line_style() {
        commands.push(format!("SetLineStyle({}, {})", name, style.code()));
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, expression: &str, domain: Option<(f64, f64)>) -> FunctionPlot {
        FunctionPlot {
            name: name.to_string(),
            expression: expression.to_string(),
            domain: domain.map(|(min, max)| Interval { min, max }),
            styling: PlotStyling::default(),
        }
    }

    #[test]
    fn test_function_without_domain() {
        assert_eq!(function_command(&function("f", "x^2", None)), "f(x) = x^2");
    }

    #[test]
    fn test_function_with_domain() {
        assert_eq!(
            function_command(&function("g", "sin(x)", Some((0.0, 6.28)))),
            "g(x) = If(0 <= x <= 6.28, sin(x), ?)"
        );
        assert_eq!(
            function_command(&function("f", "x^3", Some((-2.0, 2.0)))),
            "f(x) = If(-2 <= x <= 2, x^3, ?)"
        );
    }

    #[test]
    fn test_parametric() {
        let plot = ParametricPlot {
            name: "spiral".to_string(),
            x_expression: "s*cos(s)".to_string(),
            y_expression: "s*sin(s)".to_string(),
            parameter: "s".to_string(),
            range: Interval { min: 0.0, max: 10.0 },
            styling: PlotStyling::default(),
        };
        assert_eq!(
            parametric_command(&plot),
            "spiral = Curve(s*cos(s), s*sin(s), s, 0, 10)"
        );
    }

    #[test]
    fn test_implicit() {
        let plot = ImplicitPlot {
            name: "circle".to_string(),
            expression: "x^2 + y^2 - 4".to_string(),
            styling: PlotStyling::default(),
        };
        assert_eq!(implicit_command(&plot), "circle = ImplicitCurve(x^2 + y^2 - 4)");
    }

    #[test]
    fn test_number_format() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(1e-7), "0.0000001");
    }

    #[test]
    fn test_styling_commands() {
        assert!(styling_commands("f", &PlotStyling::default()).is_empty());

        let styling = PlotStyling {
            color: Some("#FF0000".to_string()),
            thickness: Some(3.0),
            style: Some("dotted".to_string()),
        };
        assert_eq!(
            styling_commands("f", &styling),
            vec![
                "SetColor(f, \"#FF0000\")".to_string(),
                "SetLineThickness(f, 3)".to_string(),
                "SetLineStyle(f, 3)".to_string(),
            ]
        );
    }

    #[test]
    fn test_thickness_is_whole_number() {
        let styling = PlotStyling {
            thickness: Some(2.5),
            ..PlotStyling::default()
        };
        assert_eq!(styling_commands("f", &styling), vec!["SetLineThickness(f, 3)"]);
    }
}
