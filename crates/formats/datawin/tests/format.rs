use datawin::bytecode::{self, ComparisonKind, DataType, Opcode, Operand};
use datawin::cursor::{Cursor, Writer};
use datawin::reader::ChunkIndex;
use datawin::Error;

fn minimal_form() -> Vec<u8> {
    let mut w = Writer::new();
    w.write_magic(b"FORM");
    w.write_u32(0);
    w.write_magic(b"GEN8");
    w.write_u32(4);
    w.write_u32(0xDEAD_BEEF);
    w.write_magic(b"STRG");
    w.write_u32(8);
    w.write_u32(1);
    w.write_u32(2);
    let total = w.position();
    w.patch_u32(4, (total - 8) as u32);
    w.into_bytes()
}

#[test]
fn chunk_index_walks_the_envelope() {
    let data = minimal_form();
    let index = ChunkIndex::parse(&data).expect("parses");
    assert_eq!(index.len(), 2);
    let magics: Vec<&str> = index.chunks().iter().map(|c| c.magic_str()).collect();
    assert_eq!(magics, ["GEN8", "STRG"]);

    let gen8 = index.find(b"GEN8").expect("GEN8 found");
    assert_eq!(gen8.offset, 8);
    assert_eq!(gen8.size, 4);
    assert_eq!(index.chunk_data(&data, b"GEN8").unwrap(), 0xDEAD_BEEFu32.to_le_bytes());
}

#[test]
fn bad_magic_is_rejected() {
    let err = ChunkIndex::parse(b"MROF\0\0\0\0").unwrap_err();
    assert!(matches!(err, Error::InvalidMagic { .. }));
}

#[test]
fn overrunning_chunk_length_is_rejected() {
    let mut w = Writer::new();
    w.write_magic(b"FORM");
    w.write_u32(12);
    w.write_magic(b"GEN8");
    w.write_u32(400); // declared size overruns the FORM payload
    w.write_u32(0);
    let err = ChunkIndex::parse(&w.into_bytes()).unwrap_err();
    assert!(matches!(err, Error::ChunkOverrun { .. }));
}

#[test]
fn missing_chunk_reports_its_magic() {
    let data = minimal_form();
    let index = ChunkIndex::parse(&data).expect("parses");
    let err = index.chunk_data(&data, b"ROOM").unwrap_err();
    assert!(matches!(err, Error::ChunkNotFound { magic } if &magic == b"ROOM"));
}

#[test]
fn cursor_reads_what_writer_wrote() {
    let mut w = Writer::new();
    w.write_u32(7);
    w.write_i32(-3);
    w.write_f64(2.5);
    w.write_gm_string("hello");
    w.align4();
    let bytes = w.into_bytes();

    let mut c = Cursor::new(&bytes);
    assert_eq!(c.read_u32().unwrap(), 7);
    assert_eq!(c.read_i32().unwrap(), -3);
    assert_eq!(c.read_f64().unwrap(), 2.5);
    assert_eq!(c.read_gm_string().unwrap(), "hello");
}

#[test]
fn pointer_list_with_bogus_count_is_rejected() {
    let mut w = Writer::new();
    w.write_u32(1000);
    w.write_u32(0);
    let bytes = w.into_bytes();
    let mut c = Cursor::new(&bytes);
    assert!(c.read_pointer_list().is_err());
}

// ---------------------------------------------------------------------------
// Bytecode decoding
// ---------------------------------------------------------------------------

fn decode_words(words: &[u32]) -> Vec<bytecode::Instruction> {
    let mut bytes = Vec::new();
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    bytecode::decode(&bytes).expect("decodes")
}

#[test]
fn decodes_push_int16_inline() {
    let insts = decode_words(&[0x840F_FFFB]); // pushi.e -5
    assert_eq!(insts.len(), 1);
    assert_eq!(insts[0].opcode, Opcode::PushI);
    assert_eq!(insts[0].type1, DataType::Int16);
    assert!(matches!(insts[0].operand, Operand::Int16(-5)));
    assert_eq!(insts[0].size, 4);
}

#[test]
fn decodes_push_double_with_trailing_literal() {
    let bits = 1.5f64.to_bits();
    let insts = decode_words(&[0xC000_0000, bits as u32, (bits >> 32) as u32]);
    assert_eq!(insts.len(), 1);
    assert_eq!(insts[0].size, 12);
    assert!(matches!(insts[0].operand, Operand::Double(v) if v == 1.5));
}

#[test]
fn branch_offsets_sign_extend_and_scale_to_bytes() {
    // Forward 3 words.
    let insts = decode_words(&[0xB600_0003]);
    assert!(matches!(insts[0].operand, Operand::Branch(12)));
    // Backward 2 words: 23-bit two's complement.
    let insts = decode_words(&[0xB67F_FFFE]);
    assert!(matches!(insts[0].operand, Operand::Branch(-8)));
}

#[test]
fn popenv_exit_magic_decodes_as_large_negative_branch() {
    let insts = decode_words(&[0xBB70_0000]);
    assert!(matches!(insts[0].operand, Operand::Branch(-4194304)));
}

#[test]
fn decodes_comparison_kind() {
    let insts = decode_words(&[0x1555_0300]); // cmp.v.v equal
    assert_eq!(insts[0].opcode, Opcode::Cmp);
    assert!(matches!(
        insts[0].operand,
        Operand::Comparison(ComparisonKind::Equal)
    ));
}

#[test]
fn decodes_call_with_function_reference() {
    let insts = decode_words(&[0xD900_0002, 0x0000_002A]);
    assert!(matches!(
        insts[0].operand,
        Operand::Call {
            function_id: 42,
            argc: 2
        }
    ));
    assert_eq!(insts[0].size, 8);
}

#[test]
fn decodes_variable_pop_with_scope_and_slot() {
    // pop.v.v self.var: scope -1 in the low half, slot 7 normal-ref.
    let insts = decode_words(&[0x4555_FFFF, 0xA000_0007]);
    match insts[0].operand {
        Operand::Variable { var_ref, scope } => {
            assert_eq!(scope, -1);
            assert_eq!(var_ref.slot, 7);
            assert!(!var_ref.is_array());
        }
        ref other => panic!("unexpected operand {other:?}"),
    }
}

#[test]
fn unknown_opcode_is_an_error() {
    let bytes = 0x0100_0000u32.to_le_bytes();
    let err = bytecode::decode(&bytes).unwrap_err();
    assert!(err.to_string().contains("unknown opcode"));
}

#[test]
fn truncated_instruction_is_an_error() {
    let err = bytecode::decode(&[0xC0, 0x00]).unwrap_err();
    assert!(err.to_string().contains("truncated"));
}

// Gated on a real container being present; set ENCORE_DATA to point at a
// game.unx / data.win to exercise the full chunk walk.
#[test]
fn parse_real_container_chunks() {
    let Some(path) = std::env::var_os("ENCORE_DATA") else {
        eprintln!("skipping: ENCORE_DATA not set");
        return;
    };
    let data = std::fs::read(path).expect("readable container");
    let start = datawin::find_form(&data).expect("FORM header");
    let index = ChunkIndex::parse(&data[start..]).expect("parses");
    for required in [b"GEN8", b"STRG", b"TXTR", b"TPAG", b"SPRT", b"OBJT", b"ROOM", b"CODE"] {
        assert!(index.find(required).is_some(), "missing {required:?}");
    }
}
