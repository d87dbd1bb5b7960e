use super::{Operand, Syntax};

/// Sintaxis AT&T, la predeterminada de `as`.
pub struct Att;

impl Syntax for Att {
    const DIRECTIVE: Option<&'static str> = None;
    const SOURCE_FIRST: bool = true;

    fn mnemonic(mnemonic: &'static str) -> &'static str {
        // Extensiones de signo y cero llevan sufijos de tamaño explícitos
        match mnemonic {
            "cqo" => "cqto",
            "movzb" => "movzbq",
            other => other,
        }
    }

    fn operand(operand: Operand) -> String {
        match operand {
            Operand::Reg(reg) => format!("%{}", reg.name()),
            Operand::Imm(value) => format!("${}", value),
            Operand::Deref(reg) => format!("(%{})", reg.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Reg;

    #[test]
    fn operands() {
        assert_eq!(Att::operand(Operand::Reg(Reg::Rdi)), "%rdi");
        assert_eq!(Att::operand(Operand::Imm(208)), "$208");
        assert_eq!(Att::operand(Operand::Deref(Reg::Rax)), "(%rax)");
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Att::mnemonic("cqo"), "cqto");
        assert_eq!(Att::mnemonic("movzb"), "movzbq");
        assert_eq!(Att::mnemonic("push"), "push");
    }
}
