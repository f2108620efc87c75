// helium-vm - Property-based tests for the compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the compiler.
//!
//! Tests the following properties:
//! - Constant pool deduplication: one pool entry per distinct literal
//! - Jump validity: every JMP/JIF target stays inside the code vector
//! - Symbol stability: a name's slot is assigned once and every store
//!   targets it

use std::collections::HashSet;

use helium_vm::{Op, OperandKind, compile_source};
use proptest::prelude::*;

proptest! {
    #[test]
    fn constant_pool_deduplicates_literals(
        values in prop::collection::vec(0i64..5, 1..12)
    ) {
        let expression = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        let source = format!("x <- {}", expression);

        let program = compile_source(&source, "prop.he").unwrap();

        let distinct: HashSet<i64> = values.iter().copied().collect();
        prop_assert_eq!(program.constants.len(), distinct.len());
    }

    #[test]
    fn jump_targets_stay_in_range(depth in 1usize..5, count in 1usize..4) {
        let mut source = String::from("x <- 0\n");
        for _ in 0..count {
            let mut statement = String::from("x <- x + 1");
            for _ in 0..depth {
                statement = format!("if x < 10 {{ {} }} else {{ x <- 0 }}", statement);
            }
            source.push_str(&statement);
            source.push('\n');
        }
        source.push_str("loop x < 5 { x <- x + 1 }\n");

        let program = compile_source(&source, "prop.he").unwrap();

        for instruction in &program.code {
            if instruction.op().operand_kind() == OperandKind::Signed {
                let target = instruction.sx();
                prop_assert!(target >= 0);
                prop_assert!((target as usize) <= program.code.len());
            }
        }
    }

    #[test]
    fn symbol_slots_are_stable(
        names in prop::collection::vec("[a-f]", 1..20)
    ) {
        let source = names
            .iter()
            .map(|name| format!("{} <- 1", name))
            .collect::<Vec<_>>()
            .join("\n");

        let program = compile_source(&source, "prop.he").unwrap();

        // Slots are contiguous from zero in declaration order.
        let slots: Vec<u16> = program.symbol_table.values().copied().collect();
        let expected: Vec<u16> = (0..program.symbol_table.len() as u16).collect();
        prop_assert_eq!(slots, expected);

        // The i-th assignment stores to the slot its name resolved to.
        let stores: Vec<u16> = program
            .code
            .iter()
            .filter(|i| i.op() == Op::StorL)
            .map(|i| i.ux())
            .collect();
        prop_assert_eq!(stores.len(), names.len());
        for (name, store) in names.iter().zip(stores) {
            prop_assert_eq!(program.lookup_symbol(name), Some(store));
        }
    }
}
