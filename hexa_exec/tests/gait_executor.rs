//! Tests of the gait executor driving simulated servo boards.

use std::collections::HashMap;

use hexa_lib::{
    gait_ctrl::{
        GaitAction, GaitCmd, GaitExecutor, Joint, Leg, LegTopology, Params,
    },
    servo_ctrl::{
        sim::{SimDriver, SimEvent, SimLog, SimSuspend},
        PwmTiming, ServoHat,
    },
};
use util::script_interpreter::{PendingCmds, ScriptInterpreter};

const BANK_NAMES: [&str; 2] = ["right", "left"];

fn dual_executor(log: &SimLog) -> GaitExecutor<SimDriver> {
    let hat = |name: &str| {
        ServoHat::new(name, SimDriver::recording(name, log.clone()), PwmTiming::default())
            .unwrap()
    };

    GaitExecutor::new_dual(hat("right"), hat("left"), SimSuspend::recording(log.clone()))
        .unwrap()
}

/// Events the executor must produce for the action, derived from its plan.
fn expected_events(action: GaitAction) -> Vec<SimEvent> {
    let topo = LegTopology::dual_bank();
    let timing = PwmTiming::default();
    let mut events = vec![];

    for phase in action.plan(&topo, &Params::dual_bank()) {
        for d in phase.demands.iter() {
            let addr = topo.channel_for(d.leg, d.joint).unwrap();
            let joint = topo.joint(d.leg, d.joint).unwrap();

            events.push(SimEvent::SetPwm {
                bank: BANK_NAMES[addr.bank].to_string(),
                channel: addr.channel,
                on_tick: 0,
                off_tick: timing.duty_cycle(joint.servo_angle(d.angle_deg)),
            });
        }

        if let Some(delay) = phase.delay {
            events.push(SimEvent::Suspend(delay));
        }
    }

    events
}

/// The events logged after start up and before the banks are closed.
fn action_events(log: &SimLog) -> Vec<SimEvent> {
    log.events()
        .into_iter()
        .filter(|e| match e {
            SimEvent::SetPwm { .. } | SimEvent::Suspend(_) => true,
            _ => false,
        })
        // Skip the knee initialisation
        .skip(6)
        .collect()
}

/// Last duty cycle written to each (bank, channel).
fn final_duties(events: &[SimEvent]) -> HashMap<(String, u8), u16> {
    let mut duties = HashMap::new();

    for e in events {
        if let SimEvent::SetPwm { bank, channel, off_tick, .. } = e {
            duties.insert((bank.clone(), *channel), *off_tick);
        }
    }

    duties
}

#[test]
fn test_actions_never_interleave() {
    let log = SimLog::new();
    let exec = dual_executor(&log);

    exec.turn_clockwise().unwrap();
    exec.forward().unwrap();
    exec.shutdown().unwrap();

    let mut expected = expected_events(GaitAction::TurnClockwise);
    expected.extend(expected_events(GaitAction::Forward));

    assert_eq!(action_events(&log), expected);
}

#[test]
fn test_stand_still_writes_each_channel_once() {
    let log = SimLog::new();
    let exec = dual_executor(&log);

    exec.stand_still().unwrap();
    exec.shutdown().unwrap();

    let events = action_events(&log);
    let topo = LegTopology::dual_bank();
    let timing = PwmTiming::default();

    // 6 horizontal and 6 vertical joints, no delay
    assert_eq!(events.len(), 12);
    assert_eq!(final_duties(&events).len(), 12);

    // Plain joints at base, the reversed mid verticals at 180 - base
    let duties = final_duties(&events);
    assert_eq!(
        duties[&(String::from("right"), 0)],
        timing.duty_cycle(topo.base_angle(Leg::RightFront, Joint::Horizontal).unwrap())
    );
    assert_eq!(duties[&(String::from("right"), 5)], timing.duty_cycle(180.0 - 65.0));
    assert_eq!(duties[&(String::from("left"), 5)], timing.duty_cycle(180.0 - 110.0));
    assert_eq!(duties[&(String::from("left"), 9)], timing.duty_cycle(130.0));
}

#[test]
fn test_stand_still_idempotent() {
    let once = SimLog::new();
    let exec = dual_executor(&once);
    exec.forward().unwrap();
    exec.stand_still().unwrap();
    exec.shutdown().unwrap();

    let twice = SimLog::new();
    let exec = dual_executor(&twice);
    exec.forward().unwrap();
    exec.stand_still().unwrap();
    exec.stand_still().unwrap();
    exec.shutdown().unwrap();

    assert_eq!(
        final_duties(&action_events(&once)),
        final_duties(&action_events(&twice))
    );
}

#[test]
fn test_shutdown_closes_each_bank_once() {
    let log = SimLog::new();
    let exec = dual_executor(&log);

    exec.attack().unwrap();
    exec.test(3.0).unwrap();
    exec.shutdown().unwrap();

    let events = log.events();
    for name in BANK_NAMES.iter() {
        let closes = events
            .iter()
            .filter(|e| **e == SimEvent::Close { bank: name.to_string() })
            .count();
        assert_eq!(closes, 1, "bank {} closed {} times", name, closes);
    }

    // Nothing is written once the banks are closed
    let first_close = events
        .iter()
        .position(|e| matches!(e, SimEvent::Close { .. }))
        .unwrap();
    assert!(events[first_close..]
        .iter()
        .all(|e| matches!(e, SimEvent::Close { .. })));
}

#[test]
fn test_single_bank_variant() {
    let log = SimLog::new();
    let hat = ServoHat::new(
        "single",
        SimDriver::recording("single", log.clone()),
        PwmTiming::default(),
    )
    .unwrap();
    let exec = GaitExecutor::new_single(hat, SimSuspend::recording(log.clone())).unwrap();

    exec.turn_clockwise().unwrap();
    exec.shutdown().unwrap();

    let events = log.events();

    // Four knees, the mid legs have none
    let writes = events
        .iter()
        .filter(|e| matches!(e, SimEvent::SetPwm { .. }))
        .count();
    assert_eq!(writes, 4 + 24);

    let delays: Vec<&SimEvent> = events
        .iter()
        .filter(|e| matches!(e, SimEvent::Suspend(_)))
        .collect();
    assert_eq!(delays.len(), 5);
    assert_eq!(
        delays[0],
        &SimEvent::Suspend(std::time::Duration::from_millis(80))
    );
}

#[test]
fn test_script_drives_executor() {
    let log = SimLog::new();
    let exec = dual_executor(&log);

    let mut script: ScriptInterpreter<GaitCmd> = ScriptInterpreter::from_script_str(
        "0.0: cw;\n0.5: stand;\n1.0: test 5.0;\n",
    )
    .unwrap();

    match script.get_pending_cmds_at(2.0) {
        PendingCmds::Some(cmds) => {
            assert_eq!(cmds.len(), 3);
            for c in cmds {
                exec.handle_cmd(c).unwrap();
            }
        }
        _ => panic!("Expected pending commands"),
    }

    assert!(matches!(script.get_pending_cmds_at(3.0), PendingCmds::EndOfScript));

    exec.shutdown().unwrap();

    let mut expected = expected_events(GaitAction::TurnClockwise);
    expected.extend(expected_events(GaitAction::StandStill));
    expected.extend(expected_events(GaitAction::Test { offset_deg: 5.0 }));

    assert_eq!(action_events(&log), expected);
}
