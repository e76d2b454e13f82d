use super::*;

#[test]
fn write_appends_byte_and_line() {
    let mut chunk = Chunk::new();
    chunk.write(0x01, 7);
    chunk.write(0x02, 7);
    assert_eq!(chunk.code, vec![0x01, 0x02]);
    assert_eq!(chunk.line_at(0), 7);
    assert_eq!(chunk.line_at(1), 7);
}

#[test]
fn write_op_encodes_the_discriminant() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Return, 1);
    assert_eq!(chunk.code, vec![OpCode::Return as u8]);
}

#[test]
fn add_constant_returns_its_index() {
    let mut chunk = Chunk::new();
    assert_eq!(chunk.add_constant(Value::number(1.0)), 0);
    assert_eq!(chunk.add_constant(Value::number(2.0)), 1);
    assert_eq!(chunk.constants.len(), 2);
}

#[test]
fn lines_are_tracked_per_byte_not_per_instruction() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Nil, 1);
    chunk.write_op(OpCode::Constant, 2);
    chunk.write(0, 2);
    assert_eq!(chunk.line_at(0), 1);
    assert_eq!(chunk.line_at(1), 2);
    assert_eq!(chunk.line_at(2), 2);
}

#[test]
fn from_u8_round_trips_every_opcode() {
    for byte in 0..=(OpCode::Method as u8) {
        let op = OpCode::from_u8(byte);
        assert_eq!(op as u8, byte);
    }
}

#[test]
#[should_panic(expected = "invalid opcode byte")]
fn from_u8_panics_on_an_unknown_byte() {
    OpCode::from_u8(OpCode::Method as u8 + 1);
}
