//! Canonical expression rendering.

use crate::model::calculation::Operation;

/// Renders the human-readable expression for a calculation.
///
/// Numbers use the default `f64` display (`2`, `0.5`, `-3.25`), so history
/// stays free of fixed decimal padding. That display never switches to
/// exponent notation, so extreme magnitudes render every digit. `sqrt`
/// renders as `√(a)`; every other operation renders as `a <symbol> b`.
pub fn render_expression(operand1: f64, operand2: Option<f64>, operation: Operation) -> String {
    if !operation.is_binary() {
        return format!("{}({operand1})", operation.symbol());
    }

    match operand2 {
        Some(operand2) => format!("{operand1} {} {operand2}", operation.symbol()),
        None => format!("{operand1} {} ?", operation.symbol()),
    }
}

#[cfg(test)]
mod tests {
    use super::render_expression;
    use crate::model::calculation::Operation;

    #[test]
    fn renders_binary_operations_with_symbols() {
        assert_eq!(render_expression(1.0, Some(2.0), Operation::Add), "1 + 2");
        assert_eq!(render_expression(5.5, Some(0.5), Operation::Subtract), "5.5 - 0.5");
        assert_eq!(render_expression(-3.0, Some(4.0), Operation::Multiply), "-3 * 4");
        assert_eq!(render_expression(6.0, Some(3.0), Operation::Divide), "6 / 3");
        assert_eq!(render_expression(2.0, Some(-1.0), Operation::Power), "2 ^ -1");
    }

    #[test]
    fn renders_sqrt_with_radical_and_parentheses() {
        assert_eq!(render_expression(16.0, None, Operation::Sqrt), "√(16)");
        assert_eq!(render_expression(0.25, None, Operation::Sqrt), "√(0.25)");
    }

    #[test]
    fn missing_binary_operand_renders_placeholder() {
        assert_eq!(render_expression(1.0, None, Operation::Add), "1 + ?");
    }

    #[test]
    fn extreme_magnitudes_render_positionally() {
        let tiny = render_expression(1e-20, Some(1.0), Operation::Multiply);
        assert_eq!(tiny, "0.00000000000000000001 * 1");

        let huge = render_expression(1e300, None, Operation::Sqrt);
        assert_eq!(huge, format!("√(1{})", "0".repeat(300)));
        assert!(!huge.contains('e'));
    }
}
