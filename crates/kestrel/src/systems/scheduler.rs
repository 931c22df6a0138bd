//! # Spawn Scheduling
//!
//! Rules issue a spawn plan every `interval` seconds. The number actually
//! spawned comes back one frame later as a
//! [`GameEvent::SpawnPlanCommandExecuted`], which closes the loop between
//! requested and spawned counts when pools run dry.

use kestrel_core::SpawnProfileId;
use tracing::{debug, trace};

use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::game_loop::{System, UpdateContext};
use crate::spawn::{SpawnContext, SpawnRuleId};

/// Plans one rule may issue in a single frame. Time owed beyond this is
/// forfeited.
pub const MAX_PLANS_PER_FRAME: usize = 8;

/// A periodic batch spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRule {
    /// Rule id reported back in plan events.
    pub id: SpawnRuleId,
    /// Profile to spawn from.
    pub profile: SpawnProfileId,
    /// Seconds between plans. Non-positive fires every frame.
    pub interval: f32,
    /// Objects requested per plan.
    pub amount: usize,
}

/// Running totals of one rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnRuleTotals {
    /// Objects requested so far.
    pub requested: usize,
    /// Objects confirmed spawned so far.
    pub spawned: usize,
}

#[derive(Clone, Debug)]
struct RuleState {
    rule: SpawnRule,
    elapsed: f32,
    totals: SpawnRuleTotals,
}

/// Issues spawn plans for a set of rules.
#[derive(Clone, Debug, Default)]
pub struct SpawnSchedulerSystem {
    rules: Vec<RuleState>,
}

impl SpawnSchedulerSystem {
    /// Scheduler without rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Its first plan is issued once `interval` has elapsed.
    #[must_use]
    pub fn with_rule(mut self, rule: SpawnRule) -> Self {
        self.add_rule(rule);
        self
    }

    /// Adds a rule.
    pub fn add_rule(&mut self, rule: SpawnRule) {
        self.rules.push(RuleState {
            rule,
            elapsed: 0.0,
            totals: SpawnRuleTotals::default(),
        });
    }

    /// Totals of a rule.
    #[must_use]
    pub fn totals(&self, id: SpawnRuleId) -> Option<SpawnRuleTotals> {
        self.rules
            .iter()
            .find(|state| state.rule.id == id)
            .map(|state| state.totals)
    }
}

impl System for SpawnSchedulerSystem {
    fn name(&self) -> &'static str {
        "spawn_scheduler"
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> EngineResult<()> {
        for event in ctx.delayed_events {
            let GameEvent::SpawnPlanCommandExecuted(executed) = event else {
                continue;
            };
            if let Some(state) = self.rules.iter_mut().find(|state| state.rule.id == executed.rule) {
                state.totals.spawned += executed.spawn_count;
            }
        }

        for state in &mut self.rules {
            let rule = state.rule;
            state.elapsed += ctx.delta_time;

            let plans = if rule.interval > 0.0 {
                let mut plans = 0;
                while state.elapsed >= rule.interval && plans < MAX_PLANS_PER_FRAME {
                    state.elapsed -= rule.interval;
                    plans += 1;
                }
                if state.elapsed >= rule.interval {
                    debug!(rule = %rule.id, "spawn rule behind schedule; dropping owed plans");
                    state.elapsed %= rule.interval;
                }
                plans
            } else {
                1
            };

            for _ in 0..plans {
                ctx.commands
                    .schedule_plan(rule.id, rule.profile, rule.amount, SpawnContext::default());
                state.totals.requested += rule.amount;
            }
            if plans > 0 {
                trace!(rule = %rule.id, plans, "spawn plans scheduled");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::WorldCommand;
    use crate::events::SpawnPlanCommandExecutedEvent;
    use crate::systems::harness::TestFrame;

    const RULE: SpawnRuleId = SpawnRuleId(7);

    fn scheduler() -> SpawnSchedulerSystem {
        SpawnSchedulerSystem::new().with_rule(SpawnRule {
            id: RULE,
            profile: SpawnProfileId(1),
            interval: 1.0,
            amount: 5,
        })
    }

    #[test]
    fn test_plans_follow_interval() {
        let mut frame = TestFrame::new();
        let mut system = scheduler();

        frame.run(&mut system, 0.75).unwrap();
        assert!(frame.commands.is_empty());

        frame.run(&mut system, 0.5).unwrap();
        let [WorldCommand::ScheduledSpawnPlan(plan)] = frame.commands.as_slice() else {
            panic!("expected one plan, got {:?}", frame.commands.as_slice());
        };
        assert_eq!(plan.rule, RULE);
        assert_eq!(plan.amount, 5);
        assert_eq!(system.totals(RULE).unwrap().requested, 5);
    }

    #[test]
    fn test_executed_events_update_totals() {
        let mut frame = TestFrame::new();
        let mut system = scheduler();
        frame.delayed.push(GameEvent::SpawnPlanCommandExecuted(SpawnPlanCommandExecutedEvent {
            rule: RULE,
            spawn_count: 3,
        }));
        frame.delayed.push(GameEvent::SpawnPlanCommandExecuted(SpawnPlanCommandExecutedEvent {
            rule: SpawnRuleId(99),
            spawn_count: 40,
        }));

        frame.run(&mut system, 0.0).unwrap();
        assert_eq!(
            system.totals(RULE),
            Some(SpawnRuleTotals {
                requested: 0,
                spawned: 3
            })
        );
        assert_eq!(system.totals(SpawnRuleId(99)), None);
    }

    #[test]
    fn test_plans_per_frame_are_capped() {
        let mut frame = TestFrame::new();
        let mut system = SpawnSchedulerSystem::new().with_rule(SpawnRule {
            id: RULE,
            profile: SpawnProfileId(1),
            interval: 0.001,
            amount: 2,
        });

        frame.run(&mut system, 0.1).unwrap();
        assert_eq!(frame.commands.len(), MAX_PLANS_PER_FRAME);
        assert_eq!(system.totals(RULE).unwrap().requested, 2 * MAX_PLANS_PER_FRAME);

        // The backlog is not carried into the next frame
        frame.commands.clear();
        frame.run(&mut system, 0.0).unwrap();
        assert!(frame.commands.is_empty());
    }
}
