use super::{Operand, Syntax};

/// Sintaxis Intel sin prefijos, la que acepta `as` con `.intel_syntax noprefix`.
pub struct Intel;

impl Syntax for Intel {
    const DIRECTIVE: Option<&'static str> = Some(".intel_syntax noprefix");
    const SOURCE_FIRST: bool = false;

    fn operand(operand: Operand) -> String {
        match operand {
            Operand::Reg(reg) => reg.name().to_owned(),
            Operand::Imm(value) => value.to_string(),
            Operand::Deref(reg) => format!("[{}]", reg.name()),
        }
    }
}
