//! Block editor: the ordered units of a prompt, their single edit lock, and
//! the synchronization of both with the canonical source field.
//!
//! Every user interaction arrives as an [`EditorEvent`] through
//! [`BlockEditor::handle`]. The unit list is the source of truth for order;
//! the source field is always re-derived from it. Translation requests are
//! the only suspension points and are split into a begin/complete pair so a
//! host can keep dispatching events while one is outstanding.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::error::{BlocksError, Result};
use crate::notice::Notice;
use crate::source::SourceField;
use crate::store::TranslationStore;
use crate::tokens;
use crate::translate::{BatchTranslation, TranslationClient};

/// Identifier of a unit, never reused within one editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u64);

/// One token at one position in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    id: UnitId,
    token: String,
}

impl Unit {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// What the presentation layer renders for one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView<'a> {
    pub id: UnitId,
    pub text: &'a str,
    pub translation: Option<&'a str>,
    pub editing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing(UnitId),
}

/// Element a drag gesture starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    Block(UnitId),
    EditSurface(UnitId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Double activation on a unit's block (not its edit surface)
    Activate(UnitId),
    /// New content of the edit surface
    Input(String),
    Confirm,
    Cancel,
    FocusLost,
    /// Clear the annotation of the unit being edited
    ClearShortcut,
    /// Drag finished; the full new order of units
    Reordered(Vec<UnitId>),
    /// Drag finished; one unit moved between positions
    Moved { from: usize, to: usize },
    /// The source field changed outside the editor
    ExternalChange(String),
}

/// Outstanding translate-shortcut request for one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutRequest {
    unit: UnitId,
    token: String,
}

impl ShortcutRequest {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Edit surface of one editing session; every activation starts a new session
#[derive(Debug, Clone)]
struct EditSurface {
    session: u64,
    unit: UnitId,
    token: String,
    value: String,
}

/// Focus-loss commit waiting for its grace delay
#[derive(Debug, Clone)]
struct PendingCommit {
    session: u64,
    token: String,
    value: String,
    due: Instant,
}

#[derive(Debug)]
pub struct BlockEditor {
    units: Vec<Unit>,
    next_id: u64,
    next_session: u64,
    store: TranslationStore,
    source: SourceField,
    surface: Option<EditSurface>,
    pending: Vec<PendingCommit>,
    in_flight: HashSet<UnitId>,
    notice: Notice,
    client: Arc<TranslationClient>,
    blur_grace: Duration,
}

impl BlockEditor {
    pub fn new(config: &EditorConfig, client: Arc<TranslationClient>, source: &str) -> Self {
        let mut editor = Self {
            units: Vec::new(),
            next_id: 0,
            next_session: 0,
            store: TranslationStore::new(),
            source: SourceField::new(source),
            surface: None,
            pending: Vec::new(),
            in_flight: HashSet::new(),
            notice: Notice::new(config.notice_duration()),
            client,
            blur_grace: config.blur_grace(),
        };
        editor.rebuild();
        editor
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn tokens(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.token.clone()).collect()
    }

    pub fn source(&self) -> &str {
        self.source.value()
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    pub fn client(&self) -> Arc<TranslationClient> {
        Arc::clone(&self.client)
    }

    pub fn translation(&self, token: &str) -> Option<&str> {
        self.store.get(token)
    }

    pub fn state(&self) -> EditState {
        match &self.surface {
            Some(surface) => EditState::Editing(surface.unit),
            None => EditState::Idle,
        }
    }

    pub fn is_editing(&self, id: UnitId) -> bool {
        self.state() == EditState::Editing(id)
    }

    /// Current content of the edit surface
    pub fn surface_value(&self) -> Option<&str> {
        self.surface.as_ref().map(|surface| surface.value.as_str())
    }

    /// Error notice visible right now
    pub fn notice(&self) -> Option<&str> {
        self.notice.visible(Instant::now())
    }

    pub fn blocks(&self) -> Vec<BlockView<'_>> {
        let editing = self.state();
        self.units
            .iter()
            .map(|unit| BlockView {
                id: unit.id,
                text: &unit.token,
                translation: self.store.get(&unit.token),
                editing: editing == EditState::Editing(unit.id),
            })
            .collect()
    }

    /// Edit surfaces are never draggable.
    pub fn is_drag_enabled(&self, target: DragTarget) -> bool {
        match target {
            DragTarget::Block(id) => self.position(id).is_some(),
            DragTarget::EditSurface(_) => false,
        }
    }

    pub fn handle(&mut self, event: EditorEvent) -> Result<()> {
        match event {
            EditorEvent::Activate(id) => self.activate(id),
            EditorEvent::Input(value) => self.input(value),
            EditorEvent::Confirm => self.confirm(),
            EditorEvent::Cancel => self.cancel(),
            EditorEvent::FocusLost => self.focus_lost(),
            EditorEvent::ClearShortcut => self.clear_translation(),
            EditorEvent::Reordered(order) => return self.reorder(&order),
            EditorEvent::Moved { from, to } => return self.move_unit(from, to),
            EditorEvent::ExternalChange(value) => self.external_change(&value),
        }
        Ok(())
    }

    fn activate(&mut self, id: UnitId) {
        let Some(index) = self.position(id) else {
            debug!("Ignoring activation of unknown unit {:?}", id);
            return;
        };
        if self.is_editing(id) {
            return;
        }

        // Single writer: the previous unit leaves edit mode before this one enters.
        if let Some(previous) = self.surface.take() {
            debug!("Closing edit surface of '{}'", previous.token);
            self.schedule_commit(previous, Instant::now());
        }

        let token = self.units[index].token.clone();
        // A draft still waiting for its grace delay is committed first so
        // the new surface starts from it.
        self.flush_pending(&token);
        let value = self.store.get(&token).unwrap_or_default().to_string();
        debug!("Editing translation of '{}'", token);

        let session = self.next_session;
        self.next_session += 1;
        self.surface = Some(EditSurface { session, unit: id, token, value });
    }

    fn input(&mut self, value: String) {
        if let Some(surface) = self.surface.as_mut() {
            surface.value = value;
        }
    }

    fn confirm(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.drop_pending(surface.session);
            self.store.set(&surface.token, &surface.value);
        }
    }

    fn cancel(&mut self) {
        if let Some(surface) = self.surface.take() {
            debug!("Discarded edit of '{}'", surface.token);
            self.drop_pending(surface.session);
        }
    }

    fn clear_translation(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.drop_pending(surface.session);
            self.store.delete(&surface.token);
        }
    }

    fn focus_lost(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if self.pending.iter().any(|pending| pending.session == surface.session) {
            return;
        }
        let pending = PendingCommit {
            session: surface.session,
            token: surface.token.clone(),
            value: surface.value.clone(),
            due: Instant::now() + self.blur_grace,
        };
        self.pending.push(pending);
    }

    fn schedule_commit(&mut self, surface: EditSurface, now: Instant) {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.session == surface.session) {
            pending.value = surface.value;
            return;
        }
        self.pending.push(PendingCommit {
            session: surface.session,
            token: surface.token,
            value: surface.value,
            due: now + self.blur_grace,
        });
    }

    fn drop_pending(&mut self, session: u64) {
        self.pending.retain(|pending| pending.session != session);
    }

    /// Commit scheduled drafts for `token` without waiting for their delay.
    fn flush_pending(&mut self, token: &str) {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|pending| pending.token == token);
        self.pending = waiting;
        for pending in due {
            self.store.set(&pending.token, &pending.value);
        }
    }

    /// Apply focus-loss commits whose grace delay has passed.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|pending| pending.due <= now);
        self.pending = waiting;

        for pending in due {
            // Same session still open: the surface holds the latest content and closes now.
            let open = matches!(&self.surface, Some(surface) if surface.session == pending.session);
            let value = match self.surface.take_if(|_| open) {
                Some(surface) => surface.value,
                None => pending.value,
            };
            self.store.set(&pending.token, &value);
        }
    }

    /// Wait for every scheduled focus-loss commit and apply it.
    pub async fn settle(&mut self) {
        if let Some(due) = self.pending.iter().map(|pending| pending.due).max() {
            tokio::time::sleep_until(due).await;
        }
        self.tick();
    }

    fn reorder(&mut self, order: &[UnitId]) -> Result<()> {
        if order.len() != self.units.len() {
            return Err(BlocksError::InvalidOrder(format!(
                "expected {} units, got {}",
                self.units.len(),
                order.len()
            )));
        }

        let mut seen = HashSet::with_capacity(order.len());
        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            if !seen.insert(*id) {
                return Err(BlocksError::InvalidOrder(format!("unit {:?} listed twice", id)));
            }
            let index = self
                .position(*id)
                .ok_or_else(|| BlocksError::InvalidOrder(format!("unknown unit {:?}", id)))?;
            reordered.push(self.units[index].clone());
        }

        self.units = reordered;
        info!("Blocks reordered");
        self.sync_source();
        Ok(())
    }

    fn move_unit(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.units.len();
        if from >= len || to >= len {
            return Err(BlocksError::InvalidOrder(format!(
                "cannot move position {} to {} among {} units",
                from, to, len
            )));
        }
        let unit = self.units.remove(from);
        self.units.insert(to, unit);
        info!("Block moved from {} to {}", from, to);
        self.sync_source();
        Ok(())
    }

    fn external_change(&mut self, value: &str) {
        if self.source.observe(value) {
            self.rebuild();
        }
    }

    /// Discard all units and recreate them from the source field. Stored
    /// translations and scheduled commits are keyed by text and survive.
    fn rebuild(&mut self) {
        let parsed = tokens::parse(self.source.value());
        self.surface = None;
        self.in_flight.clear();
        self.units = parsed
            .into_iter()
            .map(|token| {
                let id = UnitId(self.next_id);
                self.next_id += 1;
                Unit { id, token }
            })
            .collect();
        info!("Rebuilt {} blocks from source", self.units.len());
    }

    fn sync_source(&mut self) {
        let serialized = tokens::serialize(&self.tokens());
        self.source.write(serialized);
    }

    fn position(&self, id: UnitId) -> Option<usize> {
        self.units.iter().position(|unit| unit.id == id)
    }

    /// Start the translate shortcut for the unit being edited. Only honored
    /// while its surface is empty and no request for it is outstanding.
    pub fn begin_shortcut_translate(&mut self) -> Option<ShortcutRequest> {
        let surface = self.surface.as_ref()?;
        if !surface.value.trim().is_empty() {
            debug!("Translate shortcut ignored, surface is not empty");
            return None;
        }
        if !self.in_flight.insert(surface.unit) {
            debug!("Translate shortcut ignored, request already in flight");
            return None;
        }
        Some(ShortcutRequest {
            unit: surface.unit,
            token: surface.token.clone(),
        })
    }

    /// Apply the outcome of a shortcut request. The translation is committed
    /// by token text even if the user has moved on; the surface is filled only
    /// when it still belongs to the same unit and is still empty. Edit mode
    /// is left as is.
    pub fn complete_shortcut_translate(
        &mut self,
        request: ShortcutRequest,
        result: Result<String>,
    ) -> Option<String> {
        self.in_flight.remove(&request.unit);
        match result {
            Ok(translation) => {
                self.store.set(&request.token, &translation);
                let stored = self.store.get(&request.token)?.to_string();
                if let Some(surface) = self.surface.as_mut() {
                    if surface.unit == request.unit && surface.value.trim().is_empty() {
                        surface.value = stored.clone();
                    }
                }
                Some(stored)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    /// Translate the token being edited and fill the surface with the result.
    pub async fn shortcut_translate(&mut self) -> Option<String> {
        let request = self.begin_shortcut_translate()?;
        let client = self.client();
        let result = client.translate(request.token()).await;
        self.complete_shortcut_translate(request, result)
    }

    /// Translate every block with one batch request and store the results.
    pub async fn translate_all(&mut self) -> Option<BatchTranslation> {
        let tokens = self.tokens();
        let client = self.client();
        match client.translate_all(&tokens).await {
            Ok(batch) => {
                self.apply_batch(&batch);
                Some(batch)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    /// Store the translations of a finished batch and surface its failures.
    pub fn apply_batch(&mut self, batch: &BatchTranslation) {
        for (token, translation) in batch.translated() {
            self.store.set(token, translation);
        }
        for (token, error) in &batch.failures {
            debug!("Batch fallback left '{}' untranslated", token);
            self.report(error);
        }
        info!(
            "Stored {} of {} batch translations",
            batch.translated_count(),
            batch.entries.len()
        );
    }

    /// Surface a translation failure; the notice logs it.
    fn report(&mut self, error: &BlocksError) {
        self.notice.show(error.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslateConfig;
    use crate::translate::MockTranslationBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn editor_with(mock: MockTranslationBackend, source: &str) -> BlockEditor {
        let client = TranslationClient::with_backend(Box::new(mock), &TranslateConfig::default());
        BlockEditor::new(&EditorConfig::default(), Arc::new(client), source)
    }

    fn editor(source: &str) -> BlockEditor {
        editor_with(MockTranslationBackend::new(), source)
    }

    fn id_of(editor: &BlockEditor, token: &str) -> UnitId {
        editor
            .units()
            .iter()
            .find(|unit| unit.token() == token)
            .map(Unit::id)
            .unwrap()
    }

    fn edit(editor: &mut BlockEditor, token: &str, value: &str) {
        let id = id_of(editor, token);
        editor.handle(EditorEvent::Activate(id)).unwrap();
        editor.handle(EditorEvent::Input(value.to_string())).unwrap();
    }

    #[test]
    fn test_blocks_follow_parsed_source() {
        let editor = editor("a, b ,, c,");
        assert_eq!(editor.tokens(), vec!["a", "b", "c"]);
        assert_eq!(editor.state(), EditState::Idle);
        // Parsing alone does not rewrite the field.
        assert_eq!(editor.source(), "a, b ,, c,");
    }

    #[test]
    fn test_confirm_commits_and_empty_confirm_deletes() {
        let mut editor = editor("cat, dog");
        edit(&mut editor, "cat", " 猫 ");
        editor.handle(EditorEvent::Confirm).unwrap();
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.state(), EditState::Idle);

        edit(&mut editor, "cat", "   ");
        editor.handle(EditorEvent::Confirm).unwrap();
        assert_eq!(editor.translation("cat"), None);
    }

    #[test]
    fn test_activation_prefills_stored_translation() {
        let mut editor = editor("cat");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::Confirm).unwrap();

        editor.handle(EditorEvent::Activate(id_of(&editor, "cat"))).unwrap();
        assert_eq!(editor.surface_value(), Some("猫"));
    }

    #[test]
    fn test_cancel_discards_input() {
        let mut editor = editor("cat");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::Confirm).unwrap();

        edit(&mut editor, "cat", "狗");
        editor.handle(EditorEvent::Cancel).unwrap();
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[test]
    fn test_clear_shortcut_deletes_translation() {
        let mut editor = editor("cat");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::Confirm).unwrap();

        editor.handle(EditorEvent::Activate(id_of(&editor, "cat"))).unwrap();
        editor.handle(EditorEvent::ClearShortcut).unwrap();
        assert!(editor.store().is_empty());
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_unit_edits_at_a_time() {
        let mut editor = editor("a, b");
        let (a, b) = (id_of(&editor, "a"), id_of(&editor, "b"));

        edit(&mut editor, "a", "甲");
        editor.handle(EditorEvent::Activate(b)).unwrap();

        assert_eq!(editor.state(), EditState::Editing(b));
        assert!(!editor.is_editing(a));
        assert_eq!(editor.blocks().iter().filter(|view| view.editing).count(), 1);

        // The displaced draft is committed like a focus loss.
        editor.settle().await;
        assert_eq!(editor.translation("a"), Some("甲"));
        assert_eq!(editor.state(), EditState::Editing(b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_loss_commits_after_grace_delay() {
        let mut editor = editor("cat");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::FocusLost).unwrap();

        tokio::time::advance(Duration::from_millis(50)).await;
        editor.tick();
        assert_eq!(editor.translation("cat"), None);
        assert!(editor.is_editing(id_of(&editor, "cat")));

        tokio::time::advance(Duration::from_millis(50)).await;
        editor.tick();
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_loss_with_empty_surface_deletes() {
        let mut editor = editor("cat");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::Confirm).unwrap();

        edit(&mut editor, "cat", "");
        editor.handle(EditorEvent::FocusLost).unwrap();
        editor.settle().await;
        assert_eq!(editor.translation("cat"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_then_activating_other_unit_keeps_new_lock() {
        let mut editor = editor("a, b");
        let b = id_of(&editor, "b");

        edit(&mut editor, "a", "甲");
        editor.handle(EditorEvent::FocusLost).unwrap();
        editor.handle(EditorEvent::Activate(b)).unwrap();
        editor.handle(EditorEvent::Input("乙".to_string())).unwrap();

        editor.settle().await;
        assert_eq!(editor.translation("a"), Some("甲"));
        assert_eq!(editor.state(), EditState::Editing(b));
        assert_eq!(editor.surface_value(), Some("乙"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopening_within_grace_delay_keeps_draft_and_edit() {
        let mut editor = editor("a, b");
        let (a, b) = (id_of(&editor, "a"), id_of(&editor, "b"));

        edit(&mut editor, "a", "甲");
        editor.handle(EditorEvent::Activate(b)).unwrap();
        tokio::time::advance(Duration::from_millis(50)).await;
        editor.handle(EditorEvent::Activate(a)).unwrap();

        assert_eq!(editor.surface_value(), Some("甲"));
        assert_eq!(editor.translation("a"), Some("甲"));

        tokio::time::advance(Duration::from_millis(60)).await;
        editor.tick();
        assert_eq!(editor.state(), EditState::Editing(a));
        assert_eq!(editor.translation("a"), Some("甲"));

        // The earlier session's timer must not close the reopened surface.
        editor.handle(EditorEvent::Input("甲乙".to_string())).unwrap();
        editor.settle().await;
        assert_eq!(editor.state(), EditState::Editing(a));
        assert_eq!(editor.surface_value(), Some("甲乙"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_commits_its_own_draft_only() {
        let mut editor = editor("a, b");
        let b = id_of(&editor, "b");

        edit(&mut editor, "a", "甲");
        editor.handle(EditorEvent::FocusLost).unwrap();
        editor.handle(EditorEvent::Activate(b)).unwrap();
        editor.handle(EditorEvent::Input("乙".to_string())).unwrap();
        editor.settle().await;

        assert_eq!(editor.translation("a"), Some("甲"));
        assert_eq!(editor.translation("b"), None);
        assert_eq!(editor.surface_value(), Some("乙"));
    }

    #[test]
    fn test_reorder_updates_source_but_not_translations() {
        let mut editor = editor("a, b, c");
        edit(&mut editor, "a", "甲");
        editor.handle(EditorEvent::Confirm).unwrap();

        let order = vec![id_of(&editor, "c"), id_of(&editor, "a"), id_of(&editor, "b")];
        editor.handle(EditorEvent::Reordered(order)).unwrap();

        assert_eq!(editor.source(), "c, a, b");
        assert_eq!(editor.translation("a"), Some("甲"));
        assert_eq!(editor.store().len(), 1);
    }

    #[test]
    fn test_move_unit() {
        let mut editor = editor("a, b, c");
        editor.handle(EditorEvent::Moved { from: 2, to: 0 }).unwrap();
        assert_eq!(editor.source(), "c, a, b");

        let err = editor.handle(EditorEvent::Moved { from: 3, to: 0 }).unwrap_err();
        assert!(matches!(err, BlocksError::InvalidOrder(_)));
    }

    #[test]
    fn test_invalid_order_is_rejected() {
        let mut editor = editor("a, b");
        let a = id_of(&editor, "a");

        assert!(editor.handle(EditorEvent::Reordered(vec![a])).is_err());
        assert!(editor.handle(EditorEvent::Reordered(vec![a, a])).is_err());
        assert_eq!(editor.source(), "a, b");
    }

    #[test]
    fn test_external_change_rebuilds_and_keeps_translations() {
        let mut editor = editor("x");
        edit(&mut editor, "x", "叉");
        editor.handle(EditorEvent::Confirm).unwrap();
        let old_id = id_of(&editor, "x");

        editor.handle(EditorEvent::ExternalChange("x, y".to_string())).unwrap();

        assert_eq!(editor.tokens(), vec!["x", "y"]);
        let views = editor.blocks();
        assert_eq!(views[0].translation, Some("叉"));
        assert_eq!(views[1].translation, None);
        assert_ne!(views[0].id, old_id);
    }

    #[test]
    fn test_own_write_is_not_rebuilt() {
        let mut editor = editor("a, b");
        editor.handle(EditorEvent::Moved { from: 1, to: 0 }).unwrap();
        let ids: Vec<_> = editor.units().iter().map(Unit::id).collect();

        let echoed = editor.source().to_string();
        editor.handle(EditorEvent::ExternalChange(echoed)).unwrap();

        let after: Vec<_> = editor.units().iter().map(Unit::id).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn test_rebuild_closes_edit_surface() {
        let mut editor = editor("a");
        edit(&mut editor, "a", "甲");
        editor.handle(EditorEvent::ExternalChange("b".to_string())).unwrap();
        assert_eq!(editor.state(), EditState::Idle);
    }

    #[test]
    fn test_duplicate_tokens_share_translation() {
        let mut editor = editor("cat, dog, cat");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::Confirm).unwrap();

        let translated: Vec<_> = editor.blocks().iter().map(|view| view.translation).collect();
        assert_eq!(translated, vec![Some("猫"), None, Some("猫")]);
    }

    #[test]
    fn test_edit_surface_is_not_draggable() {
        let editor = editor("a");
        let a = id_of(&editor, "a");
        assert!(editor.is_drag_enabled(DragTarget::Block(a)));
        assert!(!editor.is_drag_enabled(DragTarget::EditSurface(a)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_fills_surface_and_stays_in_edit_mode() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_request()
            .times(1)
            .withf(|request| request.text == "cat")
            .returning(|_| Ok("猫".to_string()));
        let mut editor = editor_with(mock, "cat");
        let cat = id_of(&editor, "cat");
        editor.handle(EditorEvent::Activate(cat)).unwrap();

        assert_eq!(editor.shortcut_translate().await.as_deref(), Some("猫"));
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.surface_value(), Some("猫"));
        assert!(editor.is_editing(cat));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_ignored_when_surface_has_text() {
        let mut editor = editor("cat");
        edit(&mut editor, "cat", "猫");
        assert!(editor.shortcut_translate().await.is_none());
        assert!(editor.store().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_failure_leaves_state_and_shows_notice() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_request()
            .returning(|_| Err(BlocksError::RequestFailed("service unavailable".to_string())));
        let mut editor = editor_with(mock, "cat");
        editor.handle(EditorEvent::Activate(id_of(&editor, "cat"))).unwrap();

        assert!(editor.shortcut_translate().await.is_none());
        assert_eq!(editor.surface_value(), Some(""));
        assert!(editor.store().is_empty());
        assert_eq!(editor.notice(), Some("Translation failed: service unavailable"));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(editor.notice(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_rate_limit_is_reported() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_request().times(1).returning(|_| Ok("猫".to_string()));
        let mut editor = editor_with(mock, "cat, dog");

        editor.handle(EditorEvent::Activate(id_of(&editor, "cat"))).unwrap();
        assert!(editor.shortcut_translate().await.is_some());

        tokio::time::advance(Duration::from_millis(500)).await;
        editor.handle(EditorEvent::Activate(id_of(&editor, "dog"))).unwrap();
        assert!(editor.shortcut_translate().await.is_none());
        assert_eq!(editor.notice(), Some("Too many requests, please wait 0.5 seconds"));
        assert_eq!(editor.translation("dog"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_shortcut_is_not_repeated_and_late_result_commits() {
        let mut editor = editor("cat, dog");
        editor.handle(EditorEvent::Activate(id_of(&editor, "cat"))).unwrap();

        let request = editor.begin_shortcut_translate().unwrap();
        assert!(editor.begin_shortcut_translate().is_none());

        // User moves on before the reply arrives.
        editor.handle(EditorEvent::Activate(id_of(&editor, "dog"))).unwrap();
        let stored = editor.complete_shortcut_translate(request, Ok("猫".to_string()));

        assert_eq!(stored.as_deref(), Some("猫"));
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.surface_value(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_all_stores_positional_results() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_request()
            .times(1)
            .withf(|request| request.text == "cat | dog")
            .returning(|_| Ok("猫 | 狗".to_string()));
        let mut editor = editor_with(mock, "cat, dog");

        let batch = editor.translate_all().await.unwrap();
        assert!(batch.is_complete());
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.translation("dog"), Some("狗"));
        assert_eq!(editor.source(), "cat, dog");
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_all_failure_keeps_prior_state() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_request()
            .returning(|_| Err(BlocksError::RequestFailed("offline".to_string())));
        let mut editor = editor_with(mock, "cat, dog");
        edit(&mut editor, "cat", "猫");
        editor.handle(EditorEvent::Confirm).unwrap();

        assert!(editor.translate_all().await.is_none());
        assert_eq!(editor.translation("cat"), Some("猫"));
        assert_eq!(editor.translation("dog"), None);
        assert_eq!(editor.notice(), Some("Translation failed: offline"));
    }

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_failure_is_warned_once_per_token() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut mock = MockTranslationBackend::new();
        mock.expect_request().times(1).returning(|_| Ok("猫狗".to_string()));
        let mut editor = editor_with(mock, "cat, dog");

        let batch = editor.translate_all().await.unwrap();
        assert_eq!(batch.failures.len(), 2);
        // One for the piece-count mismatch, one per throttled token.
        assert_eq!(warnings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_fallback_reports_but_keeps_going() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_request().times(1).returning(|_| Ok("猫狗".to_string()));
        let mut editor = editor_with(mock, "cat, dog");

        let batch = editor.translate_all().await.unwrap();
        assert_eq!(batch.translated_count(), 0);
        assert!(editor.store().is_empty());
        assert!(editor.notice().unwrap().starts_with("Too many requests"));
    }
}
