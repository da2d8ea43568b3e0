//! Import orchestration
//!
//! [`Importer::import_content`] drives one run for one module: it enumerates
//! the content directory of every content entity type, ingests the files into
//! a fresh [`ImportRun`], materializes the sorted graph as the administrative
//! account, and announces what was created and updated.

use crate::codec::{Decoder, HalJsonDecoder};
use crate::core::config::ImportConfig;
use crate::core::error::Result;
use crate::core::types::LocalId;
use crate::events::{EventDispatcher, ImportEvent, ImportEventKind, ImportListener};
use crate::entity::{EntityTypeRegistry, StaticRegistry};
use crate::import::materializer::{Materializer, USER_ENTITY_TYPE};
use crate::import::run::{ImportOutcome, ImportRun};
use crate::scanner::{FsScanner, Scanner};
use crate::session::{Account, AccountSwitcher, ElevatedSession, StackAccountSwitcher};
use crate::storage::EntityStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Imports the default content shipped with modules
pub struct Importer<S: EntityStorage> {
    config: ImportConfig,
    storage: S,
    registry: Arc<dyn EntityTypeRegistry>,
    decoder: Box<dyn Decoder>,
    scanner: Box<dyn Scanner>,
    switcher: Arc<dyn AccountSwitcher>,
    events: EventDispatcher,
}

impl<S: EntityStorage> Importer<S> {
    /// Start building an importer writing to `storage`
    pub fn builder(storage: S) -> ImporterBuilder<S> {
        ImporterBuilder::new(storage)
    }

    /// Storage the importer writes to
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Import configuration in use
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Content directory of a module
    pub fn content_dir(&self, module: &str) -> PathBuf {
        self.config.modules_dir.join(module).join(&self.config.content_dir)
    }

    /// Import a module's content, updating existing entities if configured to
    pub fn import(&self, module: &str) -> Result<ImportOutcome> {
        self.import_content(module, self.config.update_existing)
    }

    /// Import a module's content.
    ///
    /// Entities that already exist are updated in place when `update_existing`
    /// is set and left alone otherwise. Any error aborts the run; entities
    /// saved before the failure stay saved.
    pub fn import_content(&self, module: &str, update_existing: bool) -> Result<ImportOutcome> {
        self.run(module, update_existing).map_err(|e| e.in_module(module))
    }

    fn run(&self, module: &str, update_existing: bool) -> Result<ImportOutcome> {
        let content_dir = self.content_dir(module);
        if !content_dir.is_dir() {
            debug!(module, dir = %content_dir.display(), "no default content");
            return Ok(ImportOutcome::empty(module));
        }

        info!(module, update_existing, "importing default content");
        let guard = ElevatedSession::begin(self.switcher.as_ref(), self.admin_account());

        let mut run = ImportRun::new(module);
        for definition in self.registry.definitions() {
            if !definition.is_content() {
                continue;
            }
            let dir = content_dir.join(&definition.id);
            if !dir.is_dir() {
                continue;
            }

            for file in self.scanner.scan(&dir)? {
                let payload = file.read()?;
                run.ingest(self.decoder.decode_record(&file.path, payload, definition)?)?;
            }
        }

        let materializer = Materializer::new(
            &self.storage,
            self.registry.as_ref(),
            self.decoder.as_ref(),
            guard.session(),
            update_existing,
        );
        let outcome = run.materialize(&materializer)?;

        for (kind, entities) in [
            (ImportEventKind::Imported, &outcome.created),
            (ImportEventKind::Updated, &outcome.updated),
        ] {
            if !entities.is_empty() {
                self.events.dispatch(&ImportEvent {
                    kind,
                    module: module.to_string(),
                    entities: entities.clone(),
                });
            }
        }

        info!(
            module,
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            skipped = outcome.skipped,
            "default content imported"
        );
        Ok(outcome)
    }

    fn admin_account(&self) -> Account {
        let id = LocalId::new(self.config.admin_account);
        let account = Account::new(id);
        match self.storage.load(USER_ENTITY_TYPE, id) {
            Ok(Some(user)) => {
                let name = user.field("name").and_then(|n| n.get(0)?.get("value")?.as_str());
                match name {
                    Some(name) => account.with_name(name),
                    None => account,
                }
            }
            Ok(None) => {
                warn!(%id, "administrative account not found, writing as it anyway");
                account
            }
            Err(e) => {
                warn!(%id, error = %e, "administrative account lookup failed");
                account
            }
        }
    }
}

/// Builder for [`Importer`]
pub struct ImporterBuilder<S: EntityStorage> {
    storage: S,
    config: ImportConfig,
    registry: Option<Arc<dyn EntityTypeRegistry>>,
    decoder: Option<Box<dyn Decoder>>,
    scanner: Option<Box<dyn Scanner>>,
    switcher: Option<Arc<dyn AccountSwitcher>>,
    events: EventDispatcher,
}

impl<S: EntityStorage> ImporterBuilder<S> {
    /// Builder with default configuration
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: ImportConfig::default(),
            registry: None,
            decoder: None,
            scanner: None,
            switcher: None,
            events: EventDispatcher::new(),
        }
    }

    /// Import configuration
    pub fn config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Entity type registry; defaults to the standard content model
    pub fn registry(mut self, registry: Arc<dyn EntityTypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Payload decoder; defaults to HAL+JSON with the configured link domain
    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// File scanner; defaults to the filesystem with the configured extension
    pub fn scanner(mut self, scanner: impl Scanner + 'static) -> Self {
        self.scanner = Some(Box::new(scanner));
        self
    }

    /// Account switcher used to elevate the run
    pub fn switcher(mut self, switcher: Arc<dyn AccountSwitcher>) -> Self {
        self.switcher = Some(switcher);
        self
    }

    /// Subscribe a listener to import events
    pub fn listener(mut self, listener: impl ImportListener + 'static) -> Self {
        self.events.subscribe(listener);
        self
    }

    /// Build the importer
    pub fn build(self) -> Importer<S> {
        let config = self.config;
        Importer {
            registry: self.registry.unwrap_or_else(|| Arc::new(StaticRegistry::standard())),
            decoder: self
                .decoder
                .unwrap_or_else(|| Box::new(HalJsonDecoder::new(config.link_domain.clone()))),
            scanner: self
                .scanner
                .unwrap_or_else(|| Box::new(FsScanner::new(config.file_extension.clone()))),
            switcher: self.switcher.unwrap_or_else(|| Arc::new(StackAccountSwitcher::new())),
            storage: self.storage,
            events: self.events,
            config,
        }
    }
}
