//! Bevy adapter: owns a `RunSession` as a resource and ticks it every frame.
//!
//! Presentation notifications are collected into a shared log and re-emitted
//! as Bevy events, so HUD systems can read them with `EventReader`.

use bevy::prelude::*;
use std::sync::{Arc, Mutex, RwLock};

use crate::collab::{PresentationEvent, PresentationLog, SharedPresentationLog};
use crate::config::BalanceConfig;
use crate::economy::RunSummary;
use crate::run::{RunCollaborators, RunSession, RunSettings};

pub struct RunSimPlugin {
    pub config: BalanceConfig,
    pub settings: RunSettings,
}

impl Default for RunSimPlugin {
    fn default() -> Self {
        Self {
            config: BalanceConfig::default(),
            settings: RunSettings::default(),
        }
    }
}

impl Plugin for RunSimPlugin {
    fn build(&self, app: &mut App) {
        let log: SharedPresentationLog = Arc::new(Mutex::new(PresentationLog::new()));
        let collab = RunCollaborators {
            presentation: Box::new(log.clone()),
            ..RunCollaborators::headless()
        };
        let session = RunSession::new(self.config.clone(), self.settings, collab);

        app.insert_resource(RunResource(Arc::new(RwLock::new(session))))
            .insert_resource(PresentationFeed(log))
            .add_event::<RunNotification>()
            .add_event::<RunEndedEvent>()
            .add_systems(Update, (run_tick_system, presentation_forward_system).chain());
    }
}

#[derive(Resource)]
pub struct RunResource(pub Arc<RwLock<RunSession>>);

#[derive(Resource)]
pub struct PresentationFeed(pub SharedPresentationLog);

/// One presentation notification from the run
#[derive(Event, Debug, Clone)]
pub struct RunNotification(pub PresentationEvent);

/// Fired once when the run ends
#[derive(Event, Debug, Clone)]
pub struct RunEndedEvent(pub RunSummary);

fn run_tick_system(time: Res<Time>, run_res: Res<RunResource>) {
    if let Ok(mut run) = run_res.0.write() {
        run.tick(time.delta_secs());
    }
}

fn presentation_forward_system(
    feed: Res<PresentationFeed>,
    mut notifications: EventWriter<RunNotification>,
    mut ended: EventWriter<RunEndedEvent>,
) {
    let events = match feed.0.lock() {
        Ok(mut log) => log.drain(),
        Err(_) => return,
    };
    for event in events {
        if let PresentationEvent::RunEnded(summary) = &event {
            ended.send(RunEndedEvent(summary.clone()));
        }
        notifications.send(RunNotification(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::event::Events;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(RunSimPlugin {
            settings: RunSettings {
                seed: 5,
                ..Default::default()
            },
            ..Default::default()
        });
        app
    }

    #[test]
    fn test_plugin_inserts_session() {
        let app = app();
        assert!(app.world().get_resource::<RunResource>().is_some());
        assert!(app.world().get_resource::<PresentationFeed>().is_some());
    }

    #[test]
    fn test_run_end_is_forwarded_once() {
        let mut app = app();
        {
            let run_res = app.world().resource::<RunResource>();
            let mut run = run_res.0.write().expect("lock");
            run.damage_player(10_000.0);
            run.end();
        }
        app.update();
        let ended = app.world().resource::<Events<RunEndedEvent>>();
        assert_eq!(ended.len(), 1);
        let notifications = app.world().resource::<Events<RunNotification>>();
        assert!(notifications
            .iter_current_update_events()
            .any(|n| matches!(n.0, PresentationEvent::HpChanged { .. })));

        app.update();
        let ended = app.world().resource::<Events<RunEndedEvent>>();
        assert!(ended.iter_current_update_events().next().is_none());
    }
}
