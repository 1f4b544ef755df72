// Application orchestrator.
//
// Owns the spin engine and the two list managers, turns user commands into
// calls on them, and forwards results and state snapshots to the TUI as
// `UiUpdate`s. Spins and list mutations are kept apart here: a spin is
// refused while any list write or lookup is outstanding, and list mutations
// are refused while the wheel is turning.

use tokio::sync::mpsc;
use tracing::{info, warn};

use reelwheel_core::spin::SpinHandle;
use reelwheel_core::{
    ErrorKind, Item, ListError, ListKind, ListManager, ListView, OwnerId, SpinEngine,
    SpinOutcome, SpinStart, WheelView,
};

use crate::command::{UserCommand, HELP};

// ---------------------------------------------------------------------------
// UI updates
// ---------------------------------------------------------------------------

/// Something the TUI should show.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Info(String),
    Error(String),
    OwnerSelected(OwnerId),
    /// Fresh snapshot of one list.
    ListChanged {
        kind: ListKind,
        view: ListView,
        capacity: Option<usize>,
    },
    /// Rotation and spinning state of the wheel, once per animation frame.
    WheelTurned(WheelView),
    SpinStarted {
        entries: usize,
    },
    Winner(Item),
}

/// Name of a list on screen and in messages.
pub fn list_label(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Wheel => "wheel",
        ListKind::Consumed => "watched list",
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub engine: SpinEngine,
    pub wheel: ListManager,
    pub consumed: ListManager,
    pub last_winner: Option<Item>,
    spin: Option<SpinHandle>,
    winner_tx: mpsc::UnboundedSender<Item>,
}

impl AppState {
    /// `winner_tx` receives every drawn winner; hand its receiver to [`run`].
    pub fn new(
        engine: SpinEngine,
        wheel: ListManager,
        consumed: ListManager,
        winner_tx: mpsc::UnboundedSender<Item>,
    ) -> Self {
        Self {
            engine,
            wheel,
            consumed,
            last_winner: None,
            spin: None,
            winner_tx,
        }
    }

    /// Load both lists for `owner`.
    pub async fn select_owner(&mut self, owner: OwnerId) -> Vec<UiUpdate> {
        self.last_winner = None;
        let (wheel, consumed) = tokio::join!(
            self.wheel.load(owner.clone()),
            self.consumed.load(owner.clone())
        );
        let mut updates = vec![UiUpdate::OwnerSelected(owner.clone())];
        for result in [wheel, consumed] {
            if let Err(e) = result {
                updates.push(UiUpdate::Error(e.to_string()));
            }
        }
        updates.push(UiUpdate::Info(format!(
            "Signed in as {owner}: {} on the wheel, {} watched",
            self.wheel.items().len(),
            self.consumed.items().len()
        )));
        updates
    }

    /// Why a list mutation cannot run right now, if it cannot.
    fn mutation_blocked(&self) -> Option<&'static str> {
        self.engine
            .is_spinning()
            .then_some("The wheel is spinning; wait for it to stop")
    }

    /// Why a spin cannot start right now, if it cannot.
    fn spin_blocked(&self) -> Option<&'static str> {
        let flags = self.wheel.flags();
        if flags.loading_list {
            Some("The wheel is still loading")
        } else if flags.resolving_title {
            Some("Still looking up a title; try again in a moment")
        } else if flags.blocks_spin() {
            Some("The wheel is still saving; try again in a moment")
        } else {
            None
        }
    }

    /// Entry at 1-based `position`, as numbered on screen.
    fn item_at(manager: &ListManager, position: usize) -> Option<Item> {
        position
            .checked_sub(1)
            .and_then(|index| manager.items().into_iter().nth(index))
    }
}

// ---------------------------------------------------------------------------
// Command handling
// ---------------------------------------------------------------------------

async fn send_all(ui_tx: &mpsc::Sender<UiUpdate>, updates: Vec<UiUpdate>) {
    for update in updates {
        let _ = ui_tx.send(update).await;
    }
}

fn error_update(err: &ListError) -> UiUpdate {
    UiUpdate::Error(err.to_string())
}

/// Execute one command (anything but `Quit`) against the state.
pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let needs_still_wheel = matches!(
        cmd,
        UserCommand::Owner(_)
            | UserCommand::Add(_)
            | UserCommand::Remove(_)
            | UserCommand::Clear
            | UserCommand::Watched
    );
    if needs_still_wheel {
        if let Some(reason) = state.mutation_blocked() {
            let _ = ui_tx.send(UiUpdate::Error(reason.into())).await;
            return;
        }
    }

    let updates = match cmd {
        UserCommand::Owner(name) => state.select_owner(OwnerId::new(name)).await,
        UserCommand::Add(title) => match state.wheel.add(&title).await {
            Ok(item) => vec![UiUpdate::Info(format!("Added {}", item.title))],
            Err(e) => vec![error_update(&e)],
        },
        UserCommand::Remove(position) => match AppState::item_at(&state.wheel, position) {
            None => vec![UiUpdate::Error(format!("No entry {position} on the wheel"))],
            Some(item) => match state.wheel.remove(&item.id).await {
                Ok(_) => vec![UiUpdate::Info(format!("Removed {}", item.title))],
                Err(e) => vec![error_update(&e)],
            },
        },
        UserCommand::Clear => match state.wheel.clear().await {
            Ok(()) => {
                state.last_winner = None;
                vec![UiUpdate::Info("Wheel cleared".into())]
            }
            Err(e) => vec![error_update(&e)],
        },
        UserCommand::Spin => spin(state),
        UserCommand::Stop => match state.spin.take() {
            Some(handle) if state.engine.is_spinning() => {
                handle.cancel();
                vec![UiUpdate::Info("Spin stopped".into())]
            }
            _ => vec![UiUpdate::Info("The wheel is not spinning".into())],
        },
        UserCommand::Watched => mark_watched(state).await,
        UserCommand::Unwatch(position) => match AppState::item_at(&state.consumed, position) {
            None => vec![UiUpdate::Error(format!("No entry {position} on the watched list"))],
            Some(item) => match state.consumed.remove(&item.id).await {
                Ok(_) => vec![UiUpdate::Info(format!("{} is no longer marked watched", item.title))],
                Err(e) => vec![error_update(&e)],
            },
        },
        UserCommand::Help => vec![UiUpdate::Info(HELP.into())],
        UserCommand::Quit => Vec::new(),
    };
    send_all(ui_tx, updates).await;
}

fn spin(state: &mut AppState) -> Vec<UiUpdate> {
    if let Some(reason) = state.spin_blocked() {
        return vec![UiUpdate::Error(reason.into())];
    }
    let items = state.wheel.items();
    if items.is_empty() {
        return vec![UiUpdate::Info("The wheel is empty; add something first".into())];
    }

    let winner_tx = state.winner_tx.clone();
    match state.engine.spin(&items, move |item| {
        let _ = winner_tx.send(item);
    }) {
        SpinStart::Ignored => vec![UiUpdate::Info("The wheel is already spinning".into())],
        SpinStart::Immediate(_) => Vec::new(),
        SpinStart::Started(handle) => {
            state.spin = Some(handle);
            vec![UiUpdate::SpinStarted {
                entries: items.len(),
            }]
        }
    }
}

/// Record the last winner as watched and take it off the wheel.
async fn mark_watched(state: &mut AppState) -> Vec<UiUpdate> {
    let Some(winner) = state.last_winner.clone() else {
        return vec![UiUpdate::Error("Spin the wheel first".into())];
    };

    let mut updates = Vec::new();
    match state.consumed.insert(winner.clone()) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::Duplicate => {
            updates.push(UiUpdate::Info(format!("{} was already watched", winner.title)));
        }
        Err(e) => return vec![error_update(&e)],
    }
    if let Err(e) = state.wheel.remove(&winner.id).await {
        updates.push(error_update(&e));
        return updates;
    }
    state.last_winner = None;
    info!(item = %winner.title, "marked watched");
    updates.push(UiUpdate::Info(format!("Enjoy {}! Moved to watched", winner.title)));
    updates
}

// ---------------------------------------------------------------------------
// List snapshots
// ---------------------------------------------------------------------------

fn list_changed(manager: &ListManager, view: ListView) -> UiUpdate {
    UiUpdate::ListChanged {
        kind: manager.kind(),
        view,
        capacity: manager.capacity(),
    }
}

/// Message for a flush that failed in the background.
fn save_failure(kind: ListKind, err: Option<&ListError>) -> String {
    let mut message = format!("Could not save your changes to the {}", list_label(kind));
    if let Some(err) = err {
        message.push_str(&format!(": {err}"));
    }
    message
}

/// Forward a list snapshot, preceded by an error when a background flush
/// has failed since `seen_failures`.
async fn forward_list(
    ui_tx: &mpsc::Sender<UiUpdate>,
    manager: &ListManager,
    view: ListView,
    seen_failures: &mut u64,
) {
    if view.flush_failures > *seen_failures {
        *seen_failures = view.flush_failures;
        warn!(list = %manager.kind(), "background save failed");
        let message = save_failure(manager.kind(), view.last_error.as_ref());
        let _ = ui_tx.send(UiUpdate::Error(message)).await;
    }
    let _ = ui_tx.send(list_changed(manager, view)).await;
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until `Quit` or the command channel
/// closes.
///
/// Listens on five sources using `tokio::select!`:
/// 1. User commands from the TUI
/// 2. Winners reported by the spin engine
/// 3. Wheel list changes, including failed background saves
/// 4. Watched list changes
/// 5. Wheel rotation frames
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut winner_rx: mpsc::UnboundedReceiver<Item>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut wheel_rx = state.wheel.subscribe();
    let mut consumed_rx = state.consumed.subscribe();
    let mut turns_rx = state.engine.subscribe();

    // Initial snapshots so the TUI starts in step.
    let wheel_view = wheel_rx.borrow_and_update().clone();
    let consumed_view = consumed_rx.borrow_and_update().clone();
    let mut wheel_failures = wheel_view.flush_failures;
    let mut consumed_failures = consumed_view.flush_failures;
    let _ = ui_tx.send(list_changed(&state.wheel, wheel_view)).await;
    let _ = ui_tx.send(list_changed(&state.consumed, consumed_view)).await;
    let turned = turns_rx.borrow_and_update().clone();
    let _ = ui_tx.send(UiUpdate::WheelTurned(turned)).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            Some(winner) = winner_rx.recv() => {
                info!(item = %winner.title, id = %winner.id, "winner drawn");
                state.spin = None;
                state.last_winner = Some(winner.clone());
                let _ = ui_tx.send(UiUpdate::Winner(winner)).await;
            }

            Ok(()) = wheel_rx.changed() => {
                let view = wheel_rx.borrow_and_update().clone();
                forward_list(&ui_tx, &state.wheel, view, &mut wheel_failures).await;
            }

            Ok(()) = consumed_rx.changed() => {
                let view = consumed_rx.borrow_and_update().clone();
                forward_list(&ui_tx, &state.consumed, view, &mut consumed_failures).await;
            }

            Ok(()) = turns_rx.changed() => {
                let view = turns_rx.borrow_and_update().clone();
                let _ = ui_tx.send(UiUpdate::WheelTurned(view)).await;
            }
        }
    }

    if let Some(handle) = state.spin.take() {
        handle.cancel();
        match handle.finished().await {
            SpinOutcome::Cancelled => {}
            SpinOutcome::Completed(item) => {
                warn!(item = %item.title, "spin completed during shutdown");
            }
            SpinOutcome::Failed(reason) => warn!("spin failed during shutdown: {reason}"),
        }
    }
    state.wheel.sync().await;
    state.consumed.sync().await;
    Ok(())
}
