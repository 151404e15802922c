//! Progress engine (§4.6): owns the aggregated drop set and the single in-flight "awaiting
//! update" future the watch loop correlates websocket/GraphQL minute updates against.
//!
//! The claim/progress correlation (a single pending update per watched drop) is built around
//! `tokio::sync::oneshot` since only one update is ever awaited at a time.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use crate::constants::CLAIM_CONFIRM_POLL_ATTEMPTS;
use crate::constants::CLAIM_CONFIRM_POLL_INTERVAL;
use crate::constants::CLAIM_SETTLE_DELAY;
use crate::gql::GqlClient;
use crate::models::DropsCampaign;

/// Outcome of a claim attempt, matching §4.6's status gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Success,
    Failure,
}

struct PendingUpdate {
    drop_id: String,
    tx: oneshot::Sender<bool>,
}

/// The progress engine. Cheaply cloneable (internals are behind a mutex) so the watch loop and
/// the websocket dispatcher can share one instance.
#[derive(Clone, Default)]
pub struct ProgressEngine {
    pending: std::sync::Arc<Mutex<Option<PendingUpdate>>>,
}

impl ProgressEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the one-shot "update expected" slot for `drop_id` and wait up to `timeout` for a
    /// `handle_drop_progress` call to resolve it. Returns `true` only if an authoritative event
    /// for the *same* drop arrived within the window; any other outcome (mismatch, timeout, no
    /// event) returns `false` so the watch loop falls back to GraphQL.
    pub async fn await_update(&self, drop_id: &str, timeout: Duration) -> bool {
        let (tx, rx) = oneshot::channel();
        {
            let mut guard = self.pending.lock().await;
            *guard = Some(PendingUpdate {
                drop_id: drop_id.to_string(),
                tx,
            });
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(handled)) => handled,
            Ok(Err(_)) | Err(_) => {
                // Timed out or the sender was dropped without resolving; clear the slot so a
                // late event doesn't spuriously "handle" the next watch iteration.
                let mut guard = self.pending.lock().await;
                if let Some(pending) = guard.as_ref() {
                    if pending.drop_id == drop_id {
                        *guard = None;
                    }
                }
                false
            }
        }
    }

    /// Websocket `drop-progress {drop_id, current_progress_min}`. Returns `true` ("handled") if
    /// an update was awaited for this exact drop, in which case `real_current_minutes` is set
    /// and the pending slot is resolved; otherwise returns `false` ("unhandled").
    pub async fn handle_drop_progress(
        &self,
        campaigns: &mut [DropsCampaign],
        drop_id: &str,
        current_minutes: i32,
    ) -> bool {
        let mut guard = self.pending.lock().await;
        let matches = matches!(guard.as_ref(), Some(p) if p.drop_id == drop_id);
        if !matches {
            return false;
        }

        for campaign in campaigns.iter_mut() {
            if let Some(drop) = campaign
                .time_based_drops
                .iter_mut()
                .find(|d| d.id == drop_id)
            {
                drop.set_real_minutes(current_minutes);
                break;
            }
        }

        if let Some(pending) = guard.take() {
            let _ = pending.tx.send(true);
        }
        true
    }

    /// Websocket `drop-claim {drop_id, drop_instance_id}`: records the claim id and attempts
    /// the claim immediately. Returns the campaign id the drop belonged to (for the caller to
    /// decide whether to restart watching or trigger `INVENTORY_FETCH`) plus the outcome.
    pub async fn handle_drop_claim(
        &self,
        campaigns: &mut [DropsCampaign],
        gql: &GqlClient,
        drop_id: &str,
        drop_instance_id: &str,
    ) -> Option<(String, ClaimOutcome)> {
        let campaign_id = campaigns.iter().find_map(|c| {
            c.time_based_drops
                .iter()
                .any(|d| d.id == drop_id)
                .then(|| c.id.clone())
        })?;

        for campaign in campaigns.iter_mut() {
            if campaign.id != campaign_id {
                continue;
            }
            if let Some(drop) = campaign
                .time_based_drops
                .iter_mut()
                .find(|d| d.id == drop_id)
            {
                drop.set_claim_id(drop_instance_id.to_string());
            }
        }

        let outcome = self.claim(campaigns, gql, &campaign_id, drop_id).await;
        Some((campaign_id, outcome))
    }

    /// §4.6 `claim()`: posts `ClaimDrop(claim_id)` and applies the status gate. Never retries
    /// on failure — the caller leaves `claim_id` set so the next inventory fetch or
    /// `drop-claim` event tries again.
    pub async fn claim(
        &self,
        campaigns: &mut [DropsCampaign],
        gql: &GqlClient,
        campaign_id: &str,
        drop_id: &str,
    ) -> ClaimOutcome {
        let claim_id = campaigns
            .iter()
            .find(|c| c.id == campaign_id)
            .and_then(|c| c.time_based_drops.iter().find(|d| d.id == drop_id))
            .and_then(|d| d.claim_id.clone());

        let Some(claim_id) = claim_id else {
            return ClaimOutcome::Failure;
        };

        let response = match gql.claim_drop(&claim_id).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("claim_drop request failed: {e}");
                return ClaimOutcome::Failure;
            }
        };

        if !claim_succeeded(&response) {
            tracing::error!("claim_drop rejected for drop {drop_id}: {response}");
            return ClaimOutcome::Failure;
        }

        let mut game_name = String::new();
        let mut drop_name = drop_id.to_string();
        for campaign in campaigns.iter_mut() {
            if campaign.id != campaign_id {
                continue;
            }
            game_name = campaign.game.display_name.clone();
            if let Some(drop) = campaign
                .time_based_drops
                .iter_mut()
                .find(|d| d.id == drop_id)
            {
                drop_name = drop.name.clone();
                drop.mark_claimed();
            }
        }
        tracing::info!("claimed drop {drop_name} ({game_name})");
        if let Err(e) = crate::notifications::send_drop_notification(&game_name, &drop_name) {
            tracing::warn!("failed to send drop notification: {e}");
        }
        ClaimOutcome::Success
    }

    /// After a successful claim, settle then poll `CurrentDrop` until the channel reports a
    /// different drop (confirming the claim took effect server-side), per §4.6.
    pub async fn confirm_claim_settled(&self, gql: &GqlClient, channel_id: &str, claimed_drop_id: &str) {
        tokio::time::sleep(CLAIM_SETTLE_DELAY).await;
        for _ in 0..CLAIM_CONFIRM_POLL_ATTEMPTS {
            match gql.get_current_drop(channel_id, "").await {
                Ok(v) => {
                    let reported = current_drop_id(&v);
                    if reported.as_deref() != Some(claimed_drop_id) {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!("confirm_claim_settled: CurrentDrop poll failed: {e}");
                }
            }
            tokio::time::sleep(CLAIM_CONFIRM_POLL_INTERVAL).await;
        }
    }

    /// Synthesize missing claim ids the next inventory cycle, per §4.6's "event loss" fallback.
    pub fn synthesize_missing_claim_ids(&self, campaigns: &mut [DropsCampaign], user_id: u64) {
        for campaign in campaigns.iter_mut() {
            let campaign_id = campaign.id.clone();
            for drop in campaign.time_based_drops.iter_mut() {
                if drop.claim_id.is_none() && drop.can_claim() {
                    drop.set_claim_id(drop.generate_claim_id(user_id, &campaign_id));
                }
            }
        }
    }
}

fn claim_succeeded(response: &Value) -> bool {
    let status = response
        .get("claimDropRewards")
        .and_then(|v| v.get("status"))
        .and_then(|v| v.as_str());
    matches!(status, Some("ELIGIBLE_FOR_ALL") | Some("DROP_INSTANCE_ALREADY_CLAIMED"))
}

fn current_drop_id(response: &Value) -> Option<String> {
    response
        .get("currentDrop")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claim_succeeds_on_eligible_for_all() {
        let resp = json!({"claimDropRewards": {"status": "ELIGIBLE_FOR_ALL"}});
        assert!(claim_succeeded(&resp));
    }

    #[test]
    fn claim_succeeds_on_already_claimed() {
        let resp = json!({"claimDropRewards": {"status": "DROP_INSTANCE_ALREADY_CLAIMED"}});
        assert!(claim_succeeded(&resp));
    }

    #[test]
    fn claim_fails_on_other_status() {
        let resp = json!({"claimDropRewards": {"status": "DROP_INSTANCE_NOT_FOUND"}});
        assert!(!claim_succeeded(&resp));
    }

    #[test]
    fn claim_fails_on_missing_field() {
        assert!(!claim_succeeded(&json!({})));
    }

    #[tokio::test]
    async fn await_update_times_out_without_matching_event() {
        let engine = ProgressEngine::new();
        let handled = engine.await_update("drop-1", Duration::from_millis(20)).await;
        assert!(!handled);
    }

    #[tokio::test]
    async fn drop_progress_resolves_matching_pending_update() {
        let engine = ProgressEngine::new();
        let engine2 = engine.clone();

        let waiter = tokio::spawn(async move {
            engine2.await_update("drop-1", Duration::from_secs(1)).await
        });

        // Give the waiter a moment to register its pending slot.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut campaigns: Vec<DropsCampaign> = vec![];
        let handled = engine
            .handle_drop_progress(&mut campaigns, "drop-1", 5)
            .await;
        assert!(handled);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn drop_progress_for_unawaited_drop_is_unhandled() {
        let engine = ProgressEngine::new();
        let mut campaigns: Vec<DropsCampaign> = vec![];
        let handled = engine
            .handle_drop_progress(&mut campaigns, "drop-unknown", 5)
            .await;
        assert!(!handled);
    }
}
