use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};

use roboblocks::block_types::BlockKind;
use roboblocks::config::EngineConfig;
use roboblocks::error::EngineError;
use roboblocks::model::{ParamValue, Program, ProgramBlock};
use roboblocks::runtime::{
    Clock, Engine, EngineState, MotorCommand, RunEvent, RunOutcome, SystemClock,
};
use roboblocks::sim::SimRobot;

fn endless() -> Result<Program> {
    let body = vec![
        ProgramBlock::new(BlockKind::RobotMove)
            .with_params(vec![ParamValue::Number(50.0), ParamValue::Number(50.0)])?,
        ProgramBlock::new(BlockKind::WaitSeconds).with_params(vec![ParamValue::Number(5.0)])?,
    ];
    Ok(Program::from_blocks(vec![
        ProgramBlock::new(BlockKind::LoopForever).with_body(body),
    ])?)
}

fn setup() -> (Engine, SimRobot) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sim = SimRobot::new(Arc::clone(&clock));
    let config = EngineConfig {
        tick_ms: 10,
        ..EngineConfig::default()
    };
    (Engine::new(config, clock), sim)
}

#[test]
fn test_stop_ends_a_running_program() -> Result<()> {
    let (engine, sim) = setup();
    let handle = engine.start(endless()?, Box::new(sim.clone()), Box::new(sim.clone()))?;
    assert_eq!(engine.state(), EngineState::Running);

    assert_eq!(
        handle.events().recv_timeout(Duration::from_secs(2))?,
        RunEvent::Started
    );
    thread::sleep(Duration::from_millis(100));
    handle.stop();

    let mut last = None;
    while let Ok(event) = handle.events().recv_timeout(Duration::from_secs(2)) {
        last = Some(event);
    }
    assert_eq!(last, Some(RunEvent::Stopped));

    let report = handle.join().map_err(|_| anyhow!("run thread panicked"))?;
    assert_eq!(report.outcome, RunOutcome::Stopped);
    assert!(report.elapsed() < Duration::from_secs(1));
    assert_eq!(engine.state(), EngineState::Idle);

    let log = sim.commands();
    assert_eq!(log.last().map(|l| l.command), Some(MotorCommand::StopAll));
    assert_eq!(sim.drive(), (0.0, 0.0));
    Ok(())
}

#[test]
fn test_second_start_is_rejected_while_running() -> Result<()> {
    let (engine, sim) = setup();
    let handle = engine.start(endless()?, Box::new(sim.clone()), Box::new(sim.clone()))?;

    let again = engine.start(endless()?, Box::new(sim.clone()), Box::new(sim.clone()));
    assert!(matches!(again, Err(EngineError::AlreadyRunning)));

    handle.stop();
    handle.join().map_err(|_| anyhow!("run thread panicked"))?;

    // Idle again: a new run is accepted.
    let handle = engine.start(endless()?, Box::new(sim.clone()), Box::new(sim.clone()))?;
    handle.stop();
    let report = handle.join().map_err(|_| anyhow!("run thread panicked"))?;
    assert_eq!(report.outcome, RunOutcome::Stopped);
    Ok(())
}

#[test]
fn test_short_program_completes_on_its_own() -> Result<()> {
    let (engine, sim) = setup();
    let program = Program::from_blocks(vec![
        ProgramBlock::new(BlockKind::MotorSingle)
            .with_params(vec![ParamValue::Choice("C".into()), ParamValue::Number(30.0)])?,
        ProgramBlock::new(BlockKind::WaitSeconds).with_params(vec![ParamValue::Number(0.05)])?,
    ])?;
    let handle = engine.start(program, Box::new(sim.clone()), Box::new(sim.clone()))?;
    let report = handle.join().map_err(|_| anyhow!("run thread panicked"))?;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(report.elapsed() >= Duration::from_millis(50));
    let log = sim.commands();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].command, MotorCommand::StopAll);
    Ok(())
}

#[test]
fn test_forever_loop_without_waits_sends_once_per_tick() -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sim = SimRobot::new(Arc::clone(&clock));
    let engine = Engine::new(EngineConfig::default(), clock);
    let program = Program::from_blocks(vec![
        ProgramBlock::new(BlockKind::LoopForever).with_body(vec![
            ProgramBlock::new(BlockKind::RobotMove)
                .with_params(vec![ParamValue::Number(50.0), ParamValue::Number(50.0)])?,
        ]),
    ])?;

    let handle = engine.start(program, Box::new(sim.clone()), Box::new(sim.clone()))?;
    thread::sleep(Duration::from_millis(200));
    handle.stop();
    let report = handle.join().map_err(|_| anyhow!("run thread panicked"))?;
    assert_eq!(report.outcome, RunOutcome::Stopped);

    // Two commands per 25 ms pass: about 16 in 200 ms plus the final stop.
    let sent = sim.commands().len();
    assert!(sent >= 3, "only {} commands sent", sent);
    assert!(sent <= 40, "{} commands sent in 200 ms", sent);
    Ok(())
}
