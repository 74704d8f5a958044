//! Command execution.
//!
//! Every editing command opens a [`DocumentSession`] on the document's slot,
//! issues one intent, and closes the session so autosave flushes the change.

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use emoji_core::{
    CanvasDocument, DocumentEntry, DocumentRegistry, GridLayout, PaletteStore, PersistenceGateway,
    PlacementId, Size, Url,
};
use emoji_runtime::{
    ChangeKind, DocumentSession, FetchState, ImageTransport, StateChange,
};
use tokio::sync::broadcast;

use crate::{CliConfig, Command, PaletteCommand};

/// Slot holding the palette store.
pub const PALETTES_SLOT: &str = "palettes";

/// Executes commands against one gateway.
pub struct App<G: ?Sized> {
    registry: DocumentRegistry<Arc<G>>,
    transport: Arc<dyn ImageTransport>,
    config: CliConfig,
}

impl<G> App<G>
where
    G: PersistenceGateway + ?Sized + 'static,
{
    /// Open the registry stored in `gateway`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn new(
        gateway: Arc<G>,
        transport: Arc<dyn ImageTransport>,
        config: CliConfig,
    ) -> anyhow::Result<Self> {
        let registry = DocumentRegistry::open(gateway).context("Failed to open registry")?;
        Ok(Self {
            registry,
            transport,
            config,
        })
    }

    /// Run one command, writing human readable output to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be completed.
    pub async fn execute(&mut self, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
        match command {
            Command::New { name } => {
                let entry = self.registry.create(name.as_deref())?;
                writeln!(out, "{}\t{}", entry.id, entry.name)?;
            }
            Command::List => {
                for entry in self.registry.documents() {
                    writeln!(out, "{}\t{}", entry.id, entry.name)?;
                }
            }
            Command::Rename { document, name } => {
                let entry = self.resolve(&document)?;
                self.registry.rename(entry.id, &name)?;
                writeln!(out, "Renamed {} to {name}", entry.name)?;
            }
            Command::Delete { document } => {
                let entry = self.resolve(&document)?;
                self.registry.delete(entry.id)?;
                writeln!(out, "Deleted {}", entry.name)?;
            }
            Command::Show { document, json } => {
                let entry = self.resolve(&document)?;
                let doc = self.registry.load_document(entry.id)?;
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&doc.to_record())?)?;
                } else {
                    print_document(&entry, &doc, out)?;
                }
            }
            Command::Add {
                document,
                glyph,
                x,
                y,
                size,
            } => {
                let session = self.open_session(&document).await?;
                let id = session.handle().add_emoji(glyph, x, y, size).await?;
                close(session).await?;
                writeln!(out, "Added placement {id}")?;
            }
            Command::Move {
                document,
                id,
                dx,
                dy,
            } => {
                let session = self.open_session(&document).await?;
                let moved = session
                    .handle()
                    .move_emoji(PlacementId::new(id), dx, dy)
                    .await?;
                close(session).await?;
                report_edit(out, moved, id, "Moved")?;
            }
            Command::Scale {
                document,
                id,
                factor,
            } => {
                let session = self.open_session(&document).await?;
                let scaled = session
                    .handle()
                    .scale_emoji(PlacementId::new(id), factor)
                    .await?;
                close(session).await?;
                report_edit(out, scaled, id, "Scaled")?;
            }
            Command::Background { document, url } => {
                let reference = url
                    .as_deref()
                    .map(Url::parse)
                    .transpose()
                    .context("Invalid background URL")?;
                self.set_background(&document, reference, out).await?;
            }
            Command::Layout {
                count,
                width,
                height,
                aspect,
            } => {
                let layout = GridLayout::with_aspect_ratio(count, Size::new(width, height), aspect);
                print_layout(&layout, (0..count).map(|i| (i + 1).to_string()), out)?;
            }
            Command::Palette(command) => self.palette(command, out)?,
        }
        Ok(())
    }

    async fn set_background(
        &self,
        document: &str,
        reference: Option<Url>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let session = self.open_session(document).await?;
        let mut changes = session.handle().subscribe();
        let clearing = reference.is_none();
        session.handle().set_background_reference(reference).await?;

        if clearing {
            close(session).await?;
            writeln!(out, "Background cleared")?;
            return Ok(());
        }

        let waited = tokio::time::timeout(self.config.wait, wait_for_background(&mut changes)).await;
        let snapshot = session.handle().snapshot().await?;
        close(session).await?;

        let stored = snapshot
            .document
            .background_reference()
            .map_or_else(String::new, ToString::to_string);
        match (waited, &snapshot.fetch_state) {
            (Ok(_), FetchState::Loaded { .. }) => {
                let (width, height) = snapshot
                    .background
                    .as_ref()
                    .map_or((0, 0), |image| (image.width, image.height));
                writeln!(out, "Background {stored} loaded ({width}x{height})")?;
            }
            (Ok(_), FetchState::Failed { reason, .. }) => {
                writeln!(out, "Background {stored} saved but failed to load: {reason}")?;
            }
            _ => {
                writeln!(out, "Background {stored} saved, still loading")?;
            }
        }
        Ok(())
    }

    fn palette(&mut self, command: PaletteCommand, out: &mut impl Write) -> anyhow::Result<()> {
        let mut store = self.load_palettes();
        match command {
            PaletteCommand::List => {
                for palette in store.palettes() {
                    writeln!(out, "{}\t{}", palette.name, palette.glyphs)?;
                }
                return Ok(());
            }
            PaletteCommand::Layout {
                palette,
                width,
                height,
            } => {
                let glyphs = resolve_palette(&store, &palette)?;
                let layout = store.glyph_layout(&glyphs, Size::new(width, height))?;
                let palette = store
                    .palettes()
                    .iter()
                    .find(|p| p.glyphs == glyphs)
                    .ok_or_else(|| anyhow!("Palette disappeared: {glyphs}"))?;
                print_layout(&layout, palette.glyphs().map(str::to_string), out)?;
                return Ok(());
            }
            PaletteCommand::Add { glyphs, name } => {
                store.add_palette(glyphs, name.clone())?;
                writeln!(out, "Added palette {name}")?;
            }
            PaletteCommand::Rename { palette, name } => {
                let glyphs = resolve_palette(&store, &palette)?;
                store.rename(&glyphs, name.clone())?;
                writeln!(out, "Renamed palette to {name}")?;
            }
            PaletteCommand::AddGlyphs { palette, glyphs } => {
                let key = resolve_palette(&store, &palette)?;
                let updated = store.add_glyphs(&key, &glyphs)?;
                writeln!(out, "{updated}")?;
            }
            PaletteCommand::RemoveGlyph { palette, glyph } => {
                let key = resolve_palette(&store, &palette)?;
                let updated = store.remove_glyph(&key, &glyph)?;
                writeln!(out, "{updated}")?;
            }
        }
        let bytes = serde_json::to_vec(&store)?;
        self.registry
            .gateway()
            .write(PALETTES_SLOT, &bytes)
            .context("Failed to save palettes")?;
        Ok(())
    }

    fn load_palettes(&self) -> PaletteStore {
        match self.registry.gateway().read(PALETTES_SLOT) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed palettes: {e}");
                PaletteStore::new()
            }),
            Ok(None) => PaletteStore::new(),
            Err(e) => {
                tracing::warn!("Failed to read palettes: {e}");
                PaletteStore::new()
            }
        }
    }

    fn resolve(&self, key: &str) -> anyhow::Result<DocumentEntry> {
        self.registry
            .find(key)
            .cloned()
            .ok_or_else(|| anyhow!("No document named {key}"))
    }

    async fn open_session(&self, document: &str) -> anyhow::Result<DocumentSession> {
        let entry = self.resolve(document)?;
        let session = DocumentSession::open(
            Arc::clone(self.registry.gateway()),
            entry.slot(),
            Arc::clone(&self.transport),
            &self.config.controller,
            self.config.autosave.clone(),
        )
        .await?;
        Ok(session)
    }
}

async fn close(session: DocumentSession) -> anyhow::Result<()> {
    let closed = session.close().await?;
    if closed.autosave.failures > 0 {
        bail!(
            "{} change(s) could not be saved",
            closed.autosave.failures
        );
    }
    Ok(())
}

async fn wait_for_background(changes: &mut broadcast::Receiver<StateChange>) {
    loop {
        match changes.recv().await {
            Ok(change) if change.kind == ChangeKind::Background => return,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

fn resolve_palette(store: &PaletteStore, key: &str) -> anyhow::Result<String> {
    store
        .palettes()
        .iter()
        .find(|p| p.name == key || p.glyphs == key)
        .map(|p| p.glyphs.clone())
        .ok_or_else(|| anyhow!("No palette named {key}"))
}

fn report_edit(out: &mut impl Write, changed: bool, id: u64, verb: &str) -> anyhow::Result<()> {
    if changed {
        writeln!(out, "{verb} placement {id}")?;
    } else {
        writeln!(out, "No change to placement {id}")?;
    }
    Ok(())
}

fn print_document(
    entry: &DocumentEntry,
    doc: &CanvasDocument,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    writeln!(out, "{} ({})", entry.name, entry.id)?;
    match doc.background_reference() {
        Some(url) => writeln!(out, "background: {url}")?,
        None => writeln!(out, "background: none")?,
    }
    for placement in doc.placements() {
        writeln!(
            out,
            "{}\t{}\tat ({}, {})\tsize {}",
            placement.id(),
            placement.text(),
            placement.x,
            placement.y,
            placement.size
        )?;
    }
    Ok(())
}

fn print_layout(
    layout: &GridLayout,
    labels: impl Iterator<Item = String>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let item = layout.item_size();
    writeln!(
        out,
        "{} rows x {} columns, cell {:.1}x{:.1}",
        layout.rows(),
        layout.columns(),
        item.width,
        item.height
    )?;
    for (label, point) in labels.zip(layout.locations()) {
        writeln!(out, "{label}\t({:.1}, {:.1})", point.x, point.y)?;
    }
    Ok(())
}
