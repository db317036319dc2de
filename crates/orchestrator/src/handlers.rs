//! Intent handlers. Each handler reads whatever slots it needs from
//! `ConversationState::slots` and returns a `TurnResult`; on success it
//! clears `current_intent` so the next turn starts fresh.

use tokio::time::timeout;
use voice_agent_core::{Error, IntentType, Result, SessionGuard, TurnResult};

use crate::Orchestrator;

fn slot_str<'a>(guard: &'a dyn SessionGuard, key: &str) -> Option<&'a str> {
    guard.state().slots.get(key).and_then(|v| v.as_str())
}

impl Orchestrator {
    pub(crate) async fn dispatch_intent(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        let intent = guard
            .state()
            .current_intent
            .expect("dispatch_intent is only called once an intent is latched");

        match intent {
            IntentType::FindNearestStation => self.handle_find_nearest_station(guard).await,
            IntentType::GetSwapHistory => self.handle_get_swap_history(guard).await,
            IntentType::CheckSubscription => self.handle_check_subscription(guard).await,
            IntentType::ExplainInvoice => self.handle_explain_invoice(guard),
            IntentType::CheckAvailability => self.handle_check_availability(guard),
            IntentType::PricingInfo => self.handle_pricing_info(guard),
            IntentType::LeaveInfo => self.handle_leave_info(guard),
            IntentType::FindDsk => self.handle_find_dsk(guard),
            IntentType::RenewSubscription => self.handle_renew_subscription(guard),
            IntentType::Unknown => unreachable!("Unknown never latches as current_intent"),
        }
    }

    async fn handle_find_nearest_station(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        let Some(location) = slot_str(guard, "location").map(str::to_string) else {
            return Ok(TurnResult::reply("Which area are you in?"));
        };

        let fetched = timeout(self.timeout_data(), self.data_client().find_nearest_station(&location)).await;
        match fetched {
            Ok(Ok(station)) => {
                guard.state_mut().current_intent = None;
                Ok(TurnResult::reply(format!(
                    "The nearest station is {} at {}.",
                    station.name, station.address
                ))
                .ending())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(Error::AdapterTimeout { adapter: "data_client" }),
        }
    }

    async fn handle_get_swap_history(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        let Some(date_range) = slot_str(guard, "date_range").map(str::to_string) else {
            return Ok(TurnResult::reply("Which date or period?"));
        };
        let driver_id = guard.state().driver_id.clone();

        let fetched = timeout(
            self.timeout_data(),
            self.data_client().get_swap_history(driver_id.as_deref(), &date_range),
        )
        .await;
        match fetched {
            Ok(Ok(records)) => {
                guard.state_mut().current_intent = None;
                let reply = match records.first() {
                    Some(latest) => format!(
                        "You have {} swap record(s); the most recent was at {}.",
                        records.len(),
                        latest.timestamp.format("%Y-%m-%d %H:%M")
                    ),
                    None => "I couldn't find any swap records for that period.".to_string(),
                };
                Ok(TurnResult::reply(reply).ending())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(Error::AdapterTimeout { adapter: "data_client" }),
        }
    }

    async fn handle_check_subscription(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        let driver_id = guard.state().driver_id.clone();
        let fetched = timeout(
            self.timeout_data(),
            self.data_client().check_subscription(driver_id.as_deref()),
        )
        .await;
        match fetched {
            Ok(Ok(subscription)) => {
                guard.state_mut().current_intent = None;
                Ok(TurnResult::reply(format!(
                    "Your subscription is {}, valid until {}.",
                    subscription.status,
                    subscription.expiry.format("%Y-%m-%d")
                ))
                .ending())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(Error::AdapterTimeout { adapter: "data_client" }),
        }
    }

    fn handle_explain_invoice(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        guard.state_mut().current_intent = None;
        Ok(TurnResult::reply(
            "Your latest invoice covers battery swaps and subscription charges for the billing period. \
             I can connect you to an agent for a line-by-line breakdown.",
        )
        .ending())
    }

    fn handle_check_availability(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        guard.state_mut().current_intent = None;
        Ok(TurnResult::reply("Swap slots are currently available at your nearest station.").ending())
    }

    fn handle_pricing_info(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        guard.state_mut().current_intent = None;
        Ok(TurnResult::reply(
            "Our standard swap plan is billed per cycle; ask for an agent if you'd like a custom quote.",
        )
        .ending())
    }

    fn handle_leave_info(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        guard.state_mut().current_intent = None;
        Ok(TurnResult::reply("Noted — I've logged your leave request for review.").ending())
    }

    fn handle_find_dsk(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        guard.state_mut().current_intent = None;
        Ok(TurnResult::reply(
            "I don't have live DSK locations in this channel yet; connecting you to an agent who can help.",
        )
        .ending())
    }

    fn handle_renew_subscription(&self, guard: &mut dyn SessionGuard) -> Result<TurnResult> {
        // Renewal changes a billing agreement; escalate rather than guess at
        // payment handling.
        guard.state_mut().current_intent = None;
        Ok(TurnResult::reply(
            "Renewing your subscription needs a quick verification. Connecting you to an agent now.",
        )
        .escalating()
        .with_data(serde_json::json!({
            "escalation_reason": "subscription renewal requires human verification",
        })))
    }
}
