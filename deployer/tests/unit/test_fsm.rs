//! FSM tests

use cloudrun_deployer::deploy::events::Phase;
use cloudrun_deployer::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), &DeploymentState::Start);
    assert!(fsm.error().is_none());
    assert_eq!(fsm.state().phase(), None);
}

#[test]
fn test_fsm_image_missing_flow() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Probe).unwrap();
    assert_eq!(fsm.state().phase(), Some(Phase::ProbingImage));

    fsm.process(DeploymentEvent::ImageMissing).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::ImageNotFound);
    assert!(fsm.state().is_terminal());
}

#[test]
fn test_fsm_readiness_timeout_flow() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Probe).unwrap();
    fsm.process(DeploymentEvent::ImageFound).unwrap();
    fsm.process(DeploymentEvent::Upserted).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::SettingAccessPolicy);

    fsm.process(DeploymentEvent::AccessPolicyDone).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::WaitingReady);

    fsm.process(DeploymentEvent::TimedOut).unwrap();
    assert_eq!(fsm.state(), &DeploymentState::Timeout);
    assert_eq!(fsm.state().phase(), Some(Phase::Timeout));
}

#[test]
fn test_fsm_no_transition_out_of_terminal_states() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Probe).unwrap();
    fsm.process(DeploymentEvent::ImageMissing).unwrap();

    assert!(fsm.process(DeploymentEvent::ImageFound).is_err());
    assert!(fsm.process(DeploymentEvent::Failed("late".to_string())).is_err());
    assert_eq!(fsm.state(), &DeploymentState::ImageNotFound);
}

#[test]
fn test_fsm_cannot_skip_steps() {
    let mut fsm = DeploymentFsm::new();
    assert!(fsm.process(DeploymentEvent::Ready).is_err());

    fsm.process(DeploymentEvent::Probe).unwrap();
    assert!(fsm.process(DeploymentEvent::Upserted).is_err());
    assert_eq!(fsm.state(), &DeploymentState::ProbingImage);
}

#[test]
fn test_fsm_access_policy_step_cannot_fail() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Probe).unwrap();
    fsm.process(DeploymentEvent::ImageFound).unwrap();
    fsm.process(DeploymentEvent::Upserted).unwrap();

    assert!(fsm.process(DeploymentEvent::Failed("iam".to_string())).is_err());
    assert_eq!(fsm.state(), &DeploymentState::SettingAccessPolicy);
}
