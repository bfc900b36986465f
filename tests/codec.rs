use pretty_assertions::assert_eq;
use regvm::decoder::{decode_operands, encode, opcode_of, Decoder, FieldError, Format, Op, Operands};
use regvm::CommandTable;

#[test]
fn ri_value_sign_extends_from_bit_19() {
    let word = (3u32 << 24) | (2 << 20) | 0x8_0000;
    assert_eq!(
        decode_operands(word, Format::Ri),
        Operands::Ri { reg: 2, value: 0x8_0000 - (1 << 20) }
    );
    let word = (3u32 << 24) | (2 << 20) | 0x7_FFFF;
    assert_eq!(
        decode_operands(word, Format::Ri),
        Operands::Ri { reg: 2, value: 0x7_FFFF }
    );
}

#[test]
fn rr_value_sign_extends_from_bit_15() {
    let word = (24u32 << 24) | (1 << 20) | (7 << 16) | 0xFFFF;
    assert_eq!(
        decode_operands(word, Format::Rr),
        Operands::Rr { in_reg: 1, out_reg: 7, value: -1 }
    );
    let word = (24u32 << 24) | 0x8000;
    assert_eq!(
        decode_operands(word, Format::Rr),
        Operands::Rr { in_reg: 0, out_reg: 0, value: 0x8000 - (1 << 16) }
    );
}

#[test]
fn rm_value_is_never_negative() {
    let word = (41u32 << 24) | (15 << 20) | 0xF_FFFF;
    assert_eq!(
        decode_operands(word, Format::Rm),
        Operands::Rm { reg: 15, value: 0xF_FFFF }
    );
}

#[test]
fn opcode_is_top_byte() {
    assert_eq!(opcode_of(0x44AB_CDEF), 0x44);
    assert_eq!(opcode_of(0x00FF_FFFF), 0);
}

#[test]
fn encode_inverts_decode_at_field_edges() {
    let cases = [
        (3u8, Operands::Ri { reg: 0, value: 0 }),
        (3, Operands::Ri { reg: 15, value: -(1 << 19) }),
        (12, Operands::Ri { reg: 9, value: (1 << 19) - 1 }),
        (41, Operands::Rm { reg: 0, value: 0 }),
        (46, Operands::Rm { reg: 4, value: (1 << 20) - 1 }),
        (24, Operands::Rr { in_reg: 15, out_reg: 0, value: -(1 << 15) }),
        (6, Operands::Rr { in_reg: 3, out_reg: 12, value: (1 << 15) - 1 }),
        (68, Operands::Rr { in_reg: 1, out_reg: 2, value: -1 }),
    ];
    for (opcode, ops) in cases {
        let word = encode(opcode, &ops).unwrap();
        assert_eq!(opcode_of(word), opcode);
        assert_eq!(decode_operands(word, ops.format()), ops);
    }
}

#[test]
fn decode_then_encode_reproduces_word() {
    for word in [0x0312_3456u32, 0x0CFF_FFFF, 0x2900_0001, 0x2EAB_CDEF, 0x1876_8000, 0x44FE_DCBA] {
        for format in [Format::Ri, Format::Rm, Format::Rr] {
            let ops = decode_operands(word, format);
            assert_eq!(encode(opcode_of(word), &ops).unwrap(), word, "{word:#x} as {format:?}");
        }
    }
}

#[test]
fn encode_rejects_out_of_range_fields() {
    assert_eq!(
        encode(3, &Operands::Ri { reg: 0, value: 1 << 19 }),
        Err(FieldError { field: "value", value: 1 << 19, min: -(1 << 19), max: (1 << 19) - 1 })
    );
    assert!(encode(41, &Operands::Rm { reg: 0, value: 1 << 20 }).is_err());
    assert!(encode(24, &Operands::Rr { in_reg: 0, out_reg: 0, value: -(1 << 15) - 1 }).is_err());
    let err = encode(24, &Operands::Rr { in_reg: 0, out_reg: 16, value: 0 }).unwrap_err();
    assert_eq!(err.field, "out_reg");
    assert_eq!(encode(3, &Operands::Ri { reg: 16, value: 0 }).unwrap_err().field, "reg");
}

#[test]
fn table_decodes_known_opcodes_only() {
    let table = CommandTable::default();
    let d = table.decode(0x3010_0005).expect("jeq");
    assert_eq!(d.op, Op::Jeq);
    assert_eq!(d.operands, Operands::Rm { reg: 1, value: 5 });
    assert!(table.decode(0xFF00_0000).is_none());
    assert!(table.decode(0).is_none());
}

#[test]
fn every_op_has_a_fixed_format() {
    let table = CommandTable::default();
    let mul = table.by_mnemonic("MUL").unwrap();
    assert_eq!((mul.opcode, mul.format()), (6, Format::Rr));
    assert_eq!(table.by_mnemonic("syscall").unwrap().format(), Format::Ri);
    assert_eq!(table.by_opcode(42).unwrap().op, Op::Ret);
    assert_eq!(table.iter().count(), 17);
}
