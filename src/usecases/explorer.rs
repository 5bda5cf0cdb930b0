//! Exploration engine: phased discovery of a bot's interactive surface.
//!
//! Phase order per run: bot info -> /start -> /help -> button BFS ->
//! reply-keyboard probing -> registered commands -> BFS resume ->
//! help-derived commands -> BFS resume -> common commands. All BFS passes
//! share one global queue and payload dedup set, so buttons surfaced by a
//! later command phase still get deep exploration. One deduplicated
//! already-tested set covers every command-probing phase.

use crate::domain::{
    CaptureRecord, ClickFailure, DomainError, ExplorationNode, MessageRecord, Report,
    RunStatistics,
};
use crate::ports::BotGateway;
use crate::usecases::interaction::{Interactor, WaitProfile};
use crate::usecases::probing::{commands_from_help, is_unknown_response, COMMON_COMMANDS};
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Traversal limits from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct ExploreLimits {
    /// Per-interaction response timeout.
    pub timeout: Duration,
    /// Maximum button depth; entries beyond it are silently dropped.
    pub max_depth: u32,
    /// Total button budget for the run (clicks and reply presses).
    pub max_buttons: usize,
}

impl Default for ExploreLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_depth: 5,
            max_buttons: 100,
        }
    }
}

/// One queued button press: where it lives, what it carries, how deep it is.
#[derive(Debug, Clone)]
struct QueuedButton {
    message_id: i32,
    label: String,
    payload: String,
    depth: u32,
    parent_path: Vec<String>,
}

/// Engine-owned traversal state, passed explicitly between phases.
/// All shared mutable state of the run lives here, under the single-threaded
/// engine; no synchronization is needed.
#[derive(Debug, Default)]
struct ExplorerState {
    queue: VecDeque<QueuedButton>,
    /// A payload is enqueued at most once for the entire run.
    visited_payloads: HashSet<String>,
    /// A command string is sent at most once across all probing phases.
    tested_commands: HashSet<String>,
    /// Reply-keyboard labels probed so far (distinct namespace from payloads).
    probed_labels: HashSet<String>,
    /// Buttons pressed so far, counted against `max_buttons`.
    pressed: usize,
    /// Set when a flood wait killed the traversal; later BFS passes stay idle.
    rate_limited: bool,
    stats: RunStatistics,
    tree: Vec<ExplorationNode>,
}

/// The exploration engine. Issues one interaction at a time and owns the
/// whole run's mutable state.
pub struct ExplorerService {
    gateway: Arc<dyn BotGateway>,
    interactor: Interactor,
    limits: ExploreLimits,
}

impl ExplorerService {
    pub fn new(gateway: Arc<dyn BotGateway>, limits: ExploreLimits, waits: WaitProfile) -> Self {
        let interactor = Interactor::new(Arc::clone(&gateway), waits, limits.timeout);
        Self {
            gateway,
            interactor,
            limits,
        }
    }

    /// Run the full discovery against `handle`. Fails only before the first
    /// interaction (unresolvable handle); everything after that is captured
    /// into the report.
    pub async fn run(&self, handle: &str) -> Result<Report, DomainError> {
        let identity = self.gateway.resolve_bot(handle).await?;
        info!(bot = %identity.username, id = identity.id, "resolved target bot");

        let mut report = Report::new(handle);
        report.bot_info.id = identity.id;
        report.bot_info.first_name = identity.first_name;
        report.bot_info.username = identity.username;

        let mut state = ExplorerState::default();
        self.explore(&mut report, &mut state).await;

        report.statistics = state.stats;
        report.structure.button_tree = std::mem::take(&mut state.tree);
        report.finished_at = Some(Utc::now());
        info!(
            interactions = report.statistics.total_interactions,
            buttons = report.statistics.buttons_explored,
            commands = report.statistics.commands_tested,
            "exploration finished"
        );
        Ok(report)
    }

    async fn explore(&self, report: &mut Report, state: &mut ExplorerState) {
        // Bot info is best-effort; a failure degrades to an annotated info
        // object and the run continues.
        match self.gateway.full_info().await {
            Ok(info) => report.bot_info = info,
            Err(e) => {
                warn!(error = %e, "bot info fetch failed");
                report.bot_info.error = Some(e.to_string());
            }
        }

        info!(phase = "start", "probing /start");
        let start_rec = self.probe_command("/start", None, state).await;
        for resp in &start_rec.responses {
            Self::enqueue_buttons(state, resp, 1, &["/start".to_string()]);
        }
        report.structure.start = Some(start_rec);

        info!(phase = "help", "probing /help");
        let help_rec = self.probe_command("/help", None, state).await;
        for resp in &help_rec.responses {
            Self::enqueue_buttons(state, resp, 1, &["/help".to_string()]);
        }
        let help_text: String = help_rec
            .responses
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        report.structure.help = Some(help_rec);

        info!(phase = "button_bfs", queued = state.queue.len(), "exploring buttons");
        self.drain_queue(state).await;

        info!(phase = "reply_keyboard", "probing reply-keyboard buttons");
        self.probe_reply_keyboard(report, state).await;

        info!(phase = "registered_commands", "probing registered commands");
        self.probe_registered(report, state).await;
        self.drain_queue(state).await;

        info!(phase = "discovered_commands", "probing commands from /help text");
        self.probe_help_derived(report, state, &help_text).await;
        self.drain_queue(state).await;

        info!(phase = "common_commands", "probing common commands");
        self.probe_common(report, state).await;
    }

    /// Send one command and account for it. `description` is carried for
    /// registered commands.
    async fn probe_command(
        &self,
        command: &str,
        description: Option<&str>,
        state: &mut ExplorerState,
    ) -> CaptureRecord {
        state.tested_commands.insert(command.to_string());
        self.interactor.throttle().await;
        let mut rec = self.interactor.send_and_capture(command).await;
        rec.command_description = description.map(String::from);
        state.stats.total_interactions += 1;
        state.stats.commands_tested += 1;
        Self::note_outcome(&mut state.stats, &rec);
        rec
    }

    fn note_outcome(stats: &mut RunStatistics, rec: &CaptureRecord) {
        if !rec.responses.is_empty() {
            stats.successful_responses += 1;
        } else if rec.timed_out {
            stats.timeouts += 1;
        } else if rec.error.is_some() {
            stats.errors += 1;
        }
    }

    /// Probe a speculative command and classify the reply. A response that
    /// only says "unknown command" is not a success; it counts toward
    /// nothing but the interaction totals.
    async fn probe_classified(&self, command: &str, state: &mut ExplorerState) -> CaptureRecord {
        state.tested_commands.insert(command.to_string());
        self.interactor.throttle().await;
        let mut rec = self.interactor.send_and_capture(command).await;
        state.stats.total_interactions += 1;
        state.stats.commands_tested += 1;

        let recognized =
            !rec.responses.is_empty() && !is_unknown_response(rec.first_response_text());
        rec.recognized = Some(recognized);
        if recognized {
            state.stats.successful_responses += 1;
        } else if rec.timed_out {
            state.stats.timeouts += 1;
        } else if rec.error.is_some() {
            state.stats.errors += 1;
        }
        rec
    }

    /// Queue every not-yet-seen callback button of `msg`, in grid order.
    fn enqueue_buttons(
        state: &mut ExplorerState,
        msg: &MessageRecord,
        depth: u32,
        parent_path: &[String],
    ) {
        for (label, data) in msg.callback_buttons() {
            if state.visited_payloads.insert(data.to_string()) {
                state.queue.push_back(QueuedButton {
                    message_id: msg.id,
                    label: label.to_string(),
                    payload: data.to_string(),
                    depth,
                    parent_path: parent_path.to_vec(),
                });
            }
        }
    }

    /// Process the queue breadth-first until it is empty, the button budget
    /// runs out, or a rate limit aborts the traversal. Re-entrant: later
    /// phases call this again after enqueueing more buttons.
    async fn drain_queue(&self, state: &mut ExplorerState) {
        if state.rate_limited {
            // No BFS resume after a flood wait; policy, not an accident.
            return;
        }

        while state.pressed < self.limits.max_buttons {
            let Some(entry) = state.queue.pop_front() else {
                break;
            };
            if entry.depth > self.limits.max_depth {
                debug!(label = %entry.label, depth = entry.depth, "dropping over-depth button");
                continue;
            }

            self.interactor.throttle().await;
            state.stats.total_interactions += 1;
            state.stats.buttons_explored += 1;
            state.pressed += 1;

            let outcome = self
                .interactor
                .click_button(entry.message_id, &entry.payload)
                .await;

            let mut path = entry.parent_path.clone();
            path.push(entry.label.clone());
            let rate_limited = matches!(outcome.error, Some(ClickFailure::RateLimited { .. }));

            if outcome.error.is_some() {
                state.stats.errors += 1;
            } else {
                state.stats.successful_responses += 1;
            }

            let mut node = ExplorationNode {
                path: path.clone(),
                depth: entry.depth,
                label: entry.label,
                payload: entry.payload,
                callback_answer: outcome.callback_answer,
                error: outcome.error,
                result_message: None,
                result_edited: None,
            };

            // Nodes at max depth never enqueue children.
            if let Some(msg) = outcome.new_message {
                if entry.depth < self.limits.max_depth {
                    Self::enqueue_buttons(state, &msg, entry.depth + 1, &path);
                }
                node.result_message = Some(msg);
            } else if let Some(msg) = outcome.edited_message {
                if entry.depth < self.limits.max_depth {
                    Self::enqueue_buttons(state, &msg, entry.depth + 1, &path);
                }
                node.result_edited = Some(msg);
            }

            state.stats.max_depth_reached = state.stats.max_depth_reached.max(entry.depth);
            state.tree.push(node);

            if rate_limited {
                warn!("flood wait during traversal; dropping remaining queue");
                state.queue.clear();
                state.rate_limited = true;
                return;
            }
        }

        if state.pressed >= self.limits.max_buttons && !state.queue.is_empty() {
            debug!(dropped = state.queue.len(), "button budget exhausted");
            state.queue.clear();
        }
    }

    /// Press every distinct reply-keyboard label seen so far, as plain text.
    /// Labels dedupe in their own namespace, separate from callback data.
    async fn probe_reply_keyboard(&self, report: &mut Report, state: &mut ExplorerState) {
        let mut labels: Vec<String> = Vec::new();
        let mut push_from = |msg: &MessageRecord, seen: &mut HashSet<String>| {
            for label in msg.reply_labels() {
                if seen.insert(label.to_string()) {
                    labels.push(label.to_string());
                }
            }
        };

        for rec in [&report.structure.start, &report.structure.help]
            .into_iter()
            .flatten()
        {
            for resp in &rec.responses {
                push_from(resp, &mut state.probed_labels);
            }
        }
        for node in &state.tree {
            for msg in [&node.result_message, &node.result_edited]
                .into_iter()
                .flatten()
            {
                push_from(msg, &mut state.probed_labels);
            }
        }

        for label in labels {
            // Reply presses consume the same button budget as clicks.
            if state.pressed >= self.limits.max_buttons {
                break;
            }
            self.interactor.throttle().await;
            let mut rec = self.interactor.send_and_capture(&label).await;
            rec.button_label = Some(label);
            state.stats.total_interactions += 1;
            state.stats.buttons_explored += 1;
            state.pressed += 1;
            Self::note_outcome(&mut state.stats, &rec);
            report.structure.reply_keyboard.push(rec);
        }
    }

    /// Probe the bot's registered command list; new buttons join the queue.
    async fn probe_registered(&self, report: &mut Report, state: &mut ExplorerState) {
        let commands = report.bot_info.registered_commands.clone();
        for cmd in commands {
            if state.tested_commands.contains(&cmd.command) {
                continue;
            }
            let rec = self
                .probe_command(&cmd.command, Some(&cmd.description), state)
                .await;
            for resp in &rec.responses {
                Self::enqueue_buttons(state, resp, 1, std::slice::from_ref(&cmd.command));
            }
            report.structure.registered_commands.push(rec);
        }
    }

    /// Probe `/command` tokens scanned out of the /help text.
    async fn probe_help_derived(
        &self,
        report: &mut Report,
        state: &mut ExplorerState,
        help_text: &str,
    ) {
        for command in commands_from_help(help_text) {
            if state.tested_commands.contains(&command) {
                continue;
            }
            let rec = self.probe_classified(&command, state).await;
            if rec.recognized == Some(true) {
                for resp in &rec.responses {
                    Self::enqueue_buttons(state, resp, 1, std::slice::from_ref(&command));
                }
            }
            report.structure.discovered_commands.push(rec);
        }
    }

    /// Probe the fixed common-command list.
    async fn probe_common(&self, report: &mut Report, state: &mut ExplorerState) {
        for command in COMMON_COMMANDS {
            if state.tested_commands.contains(*command) {
                continue;
            }
            let rec = self.probe_classified(command, state).await;
            report.structure.common_commands.push(rec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::{FakeBot, Script};

    fn explorer(bot: &Arc<FakeBot>, limits: ExploreLimits) -> ExplorerService {
        ExplorerService::new(
            Arc::clone(bot) as Arc<dyn BotGateway>,
            ExploreLimits {
                timeout: Duration::from_secs(1),
                ..limits
            },
            WaitProfile::instant(),
        )
    }

    fn default_limits() -> ExploreLimits {
        ExploreLimits {
            timeout: Duration::from_secs(1),
            max_depth: 5,
            max_buttons: 100,
        }
    }

    #[tokio::test]
    async fn test_start_buttons_form_three_node_tree() {
        let bot = FakeBot::new();
        bot.on_command(
            "/start",
            Script::message("menu").with_buttons(&[("A", "a"), ("B", "b")]),
        );
        bot.on_click("a", Script::message("sub").with_buttons(&[("C", "c")]));

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        let tree = &report.structure.button_tree;
        assert_eq!(tree.len(), 3);
        assert_eq!((tree[0].label.as_str(), tree[0].depth), ("A", 1));
        assert_eq!((tree[1].label.as_str(), tree[1].depth), ("B", 1));
        assert_eq!((tree[2].label.as_str(), tree[2].depth), ("C", 2));
        assert_eq!(tree[2].path, vec!["/start", "A", "C"]);
        assert_eq!(report.statistics.buttons_explored, 3);
        assert_eq!(report.statistics.max_depth_reached, 2);
    }

    #[tokio::test]
    async fn test_payload_clicked_once_across_parents() {
        let bot = FakeBot::new();
        bot.on_command("/start", Script::message("menu").with_buttons(&[("X", "x")]));
        // Clicking X surfaces X again from another message, plus Y.
        bot.on_click(
            "x",
            Script::message("sub").with_buttons(&[("X", "x"), ("Y", "y")]),
        );

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        assert_eq!(bot.clicked_payloads(), vec!["x", "y"]);
        let x_nodes: Vec<_> = report
            .structure
            .button_tree
            .iter()
            .filter(|n| n.payload == "x")
            .collect();
        assert_eq!(x_nodes.len(), 1);
        // The node keeps its first discovery path only.
        assert_eq!(x_nodes[0].path, vec!["/start", "X"]);
    }

    #[tokio::test]
    async fn test_depth_limit_drops_children() {
        let bot = FakeBot::new();
        bot.on_command("/start", Script::message("menu").with_buttons(&[("A", "a")]));
        bot.on_click("a", Script::message("sub").with_buttons(&[("B", "b")]));

        let report = explorer(
            &bot,
            ExploreLimits {
                max_depth: 1,
                ..default_limits()
            },
        )
        .run("@SampleBot")
        .await
        .expect("run");

        // A sits at max depth, so B is never enqueued, let alone clicked.
        assert_eq!(bot.clicked_payloads(), vec!["a"]);
        assert_eq!(report.structure.button_tree.len(), 1);
        assert!(report
            .structure
            .button_tree
            .iter()
            .all(|n| n.depth <= 1));
    }

    #[tokio::test]
    async fn test_button_budget_bounds_exploration() {
        let bot = FakeBot::new();
        bot.on_command(
            "/start",
            Script::message("menu").with_buttons(&[
                ("1", "p1"),
                ("2", "p2"),
                ("3", "p3"),
                ("4", "p4"),
                ("5", "p5"),
            ]),
        );

        let report = explorer(
            &bot,
            ExploreLimits {
                max_buttons: 2,
                ..default_limits()
            },
        )
        .run("@SampleBot")
        .await
        .expect("run");

        assert_eq!(report.statistics.buttons_explored, 2);
        assert_eq!(bot.clicked_payloads().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_aborts_traversal_for_good() {
        let bot = FakeBot::new();
        bot.on_command(
            "/start",
            Script::message("menu").with_buttons(&[("X", "x"), ("Y", "y")]),
        );
        bot.on_click_error("x", DomainError::RateLimited { seconds: 30 });
        // A later phase surfaces another button; it must stay unexplored.
        bot.set_registered(&[("/menu", "the menu")]);
        bot.on_command("/menu", Script::message("more").with_buttons(&[("Z", "z")]));

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        // Only X was clicked; Y and Z were dropped with the queue.
        assert_eq!(bot.clicked_payloads(), vec!["x"]);
        let node = &report.structure.button_tree[0];
        assert_eq!(node.error, Some(ClickFailure::RateLimited { wait_secs: 30 }));
        // The command phases after the abort still ran; /menu was covered by
        // the registered phase, so the common pass skips it.
        assert_eq!(report.structure.registered_commands.len(), 1);
        assert_eq!(
            report.structure.common_commands.len(),
            COMMON_COMMANDS.len() - 1
        );
    }

    #[tokio::test]
    async fn test_unknown_phrase_marks_common_command_unrecognized() {
        let bot = FakeBot::new();
        bot.on_command("/settings", Script::message("Unknown command, try /help"));

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        let settings = report
            .structure
            .common_commands
            .iter()
            .find(|r| r.sent == "/settings")
            .expect("settings probe");
        assert_eq!(settings.recognized, Some(false));

        let menu = report
            .structure
            .common_commands
            .iter()
            .find(|r| r.sent == "/menu")
            .expect("menu probe");
        // Silence is unrecognized too, via the timed-out branch.
        assert_eq!(menu.recognized, Some(false));
        assert!(menu.timed_out);

        // The unknown-command reply is the only response of the whole run
        // and must not count as a success.
        assert_eq!(report.statistics.successful_responses, 0);
    }

    #[tokio::test]
    async fn test_interaction_accounting_identity() {
        let bot = FakeBot::new();
        bot.on_command(
            "/start",
            Script::message("menu")
                .with_buttons(&[("A", "a"), ("B", "b")])
                .with_reply_row(&["Menu", "Help"]),
        );
        bot.on_click("a", Script::message("sub").with_buttons(&[("C", "c")]));
        bot.set_registered(&[("/about", "about us"), ("/start", "ignored, already tested")]);

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        let stats = report.statistics;
        assert_eq!(
            stats.total_interactions,
            stats.commands_tested + stats.buttons_explored
        );
        // 2 reply labels pressed on top of the 3 clicks.
        assert_eq!(stats.buttons_explored, 5);
        assert_eq!(report.structure.reply_keyboard.len(), 2);
        assert_eq!(
            report.structure.reply_keyboard[0].button_label.as_deref(),
            Some("Menu")
        );
    }

    #[tokio::test]
    async fn test_command_probed_once_across_phases() {
        let bot = FakeBot::new();
        bot.on_command("/help", Script::message("Try /info or /help for details"));
        bot.set_registered(&[("/info", "info command")]);
        bot.on_command("/info", Script::message("All about this bot"));

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        let info_sends: Vec<_> = bot
            .sent_texts()
            .into_iter()
            .filter(|t| t == "/info")
            .collect();
        assert_eq!(info_sends.len(), 1);
        // Registered phase got it first; the help-derived and common phases
        // skipped it.
        assert_eq!(report.structure.registered_commands.len(), 1);
        assert!(report
            .structure
            .discovered_commands
            .iter()
            .all(|r| r.sent != "/info"));
        assert!(report
            .structure
            .common_commands
            .iter()
            .all(|r| r.sent != "/info"));
    }

    #[tokio::test]
    async fn test_reply_label_and_payload_namespaces_are_distinct() {
        let bot = FakeBot::new();
        // Same string "Menu" as a callback payload and as a reply label.
        bot.on_command(
            "/start",
            Script::message("menu")
                .with_buttons(&[("M", "Menu")])
                .with_reply_row(&["Menu"]),
        );

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        assert_eq!(bot.clicked_payloads(), vec!["Menu"]);
        assert!(bot.sent_texts().contains(&"Menu".to_string()));
        assert_eq!(report.structure.reply_keyboard.len(), 1);
    }

    #[tokio::test]
    async fn test_bot_info_failure_degrades_gracefully() {
        let bot = FakeBot::new();
        bot.fail_full_info();

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        assert!(report.bot_info.error.is_some());
        // Identity from resolution is preserved.
        assert_eq!(report.bot_info.username, "SampleBot");
        assert!(report.ok);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_help_derived_commands_explored_with_buttons() {
        let bot = FakeBot::new();
        bot.on_command("/help", Script::message("Use /wallet to see funds"));
        bot.on_command(
            "/wallet",
            Script::message("funds").with_buttons(&[("Deposit", "dep")]),
        );

        let report = explorer(&bot, default_limits())
            .run("@SampleBot")
            .await
            .expect("run");

        let wallet = report
            .structure
            .discovered_commands
            .iter()
            .find(|r| r.sent == "/wallet")
            .expect("wallet probe");
        assert_eq!(wallet.recognized, Some(true));
        // The button surfaced by the discovered command was explored by the
        // BFS resume pass.
        assert!(bot.clicked_payloads().contains(&"dep".to_string()));
        assert!(report
            .structure
            .button_tree
            .iter()
            .any(|n| n.path == vec!["/wallet", "Deposit"]));
    }
}
