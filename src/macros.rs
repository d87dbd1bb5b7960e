macro_rules! dispatch_dialect {
    ($type:ident: $dialect:expr => $expr:expr) => {{
        use crate::dialect::{Att, Dialect, Intel};

        match $dialect {
            Dialect::Intel => {
                type $type = Intel;
                $expr
            }

            Dialect::Att => {
                type $type = Att;
                $expr
            }
        }
    }};
}

macro_rules! emit {
    ($context:expr, $mnemonic:expr) => {
        $context.instruction($mnemonic, &[])
    };

    ($context:expr, $mnemonic:expr, $($operand:expr),+) => {
        $context.instruction(
            $mnemonic,
            &[$(crate::dialect::Operand::from($operand)),+],
        )
    };
}
