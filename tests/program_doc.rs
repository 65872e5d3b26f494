use anyhow::Result;
use roboblocks::block_types::BlockKind;
use roboblocks::model::{ParamValue, Program, ProgramBlock, ProgramDoc};
use tempfile::{NamedTempFile, tempdir};

fn sample_program() -> Result<Program> {
    let state_if = ProgramBlock::new(BlockKind::StateIf)
        .with_params(vec![ParamValue::Text("ATTACK".into())])?
        .with_body(vec![ProgramBlock::new(BlockKind::RobotStop)])
        .with_else_body(vec![
            ProgramBlock::new(BlockKind::MotorSingle)
                .with_params(vec![ParamValue::Choice("C".into()), ParamValue::Number(-35.5)])?,
        ]);
    let timeout = ProgramBlock::new(BlockKind::TimeoutDoUntil)
        .with_params(vec![
            ParamValue::Choice("3".into()),
            ParamValue::Choice("GT".into()),
            ParamValue::Number(120.0),
            ParamValue::Number(2.5),
        ])?
        .with_body(vec![ProgramBlock::new(BlockKind::RobotMove)]);
    Ok(Program::from_blocks(vec![
        ProgramBlock::new(BlockKind::StateSetReason),
        ProgramBlock::new(BlockKind::LoopRepeat).with_body(vec![state_if, timeout]),
        ProgramBlock::new(BlockKind::LatchSet),
    ])?)
}

#[test]
fn test_binary_round_trip() -> Result<()> {
    let program = sample_program()?;
    let doc = ProgramDoc::from_program("sample", &program);

    let temp_file = NamedTempFile::new()?;
    doc.save_to_binary(temp_file.path())?;
    let loaded = ProgramDoc::load_from_binary(temp_file.path())?;

    assert_eq!(loaded, doc);
    let back = loaded.to_program()?;
    assert_eq!(back.to_wire(), program.to_wire());
    assert_eq!(back.len(), program.len());
    Ok(())
}

#[test]
fn test_json_round_trip_by_extension() -> Result<()> {
    let program = sample_program()?;
    let doc = ProgramDoc::from_program("sample", &program);
    let dir = tempdir()?;

    let json = dir.path().join("sample.json");
    let binary = dir.path().join("sample.rbk");
    doc.save(&json)?;
    doc.save(&binary)?;

    let text = std::fs::read_to_string(&json)?;
    assert!(text.contains("\"STATE_IF\""));
    assert!(text.contains("\"TIMEOUT_DO_UNTIL\""));

    assert_eq!(ProgramDoc::load(&json)?, doc);
    assert_eq!(ProgramDoc::load(&binary)?, doc);
    Ok(())
}

#[test]
fn test_binary_rejects_foreign_files() -> Result<()> {
    let temp_file = NamedTempFile::new()?;
    std::fs::write(temp_file.path(), b"NOTAPROGRAM-----")?;
    let err = ProgramDoc::load_from_binary(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("magic"));
    Ok(())
}

#[test]
fn test_hand_written_json_is_validated() -> Result<()> {
    let temp_file = NamedTempFile::new()?;
    std::fs::write(
        temp_file.path(),
        r#"{ "name": "bad", "blocks": [
            { "kind": "LOOP_REPEAT", "params": [ { "Number": 0.0 } ] }
        ] }"#,
    )?;
    let doc = ProgramDoc::load_from_json(temp_file.path())?;
    assert!(doc.to_program().is_err());

    std::fs::write(
        temp_file.path(),
        r#"{ "name": "ok", "blocks": [
            { "kind": "WAIT_SECONDS", "params": [ { "Number": 2.0 } ] }
        ] }"#,
    )?;
    let program = ProgramDoc::load_from_json(temp_file.path())?.to_program()?;
    assert_eq!(program.len(), 1);
    Ok(())
}

#[test]
fn test_io_errors_name_the_file() -> Result<()> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.rbk");
    let err = ProgramDoc::load(&missing).unwrap_err();
    assert!(err.to_string().contains("missing.rbk"));

    let truncated = dir.path().join("short.rbk");
    std::fs::write(&truncated, b"ROBO")?;
    let err = ProgramDoc::load(&truncated).unwrap_err();
    assert!(err.to_string().contains("short.rbk"));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, b"{ not json")?;
    let err = ProgramDoc::load(&broken).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.json"));
    Ok(())
}
