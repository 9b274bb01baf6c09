//! Core language server implementation

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

use crate::completion::{self, Dialect};
use crate::config::ServerConfig;
use crate::diagnostics;
use crate::hover;
use crate::parser::Document;
use crate::schema::MagicSchema;

/// The main Backend struct for the Magic spell language server
pub struct Backend {
    /// LSP client to communicate with the editor
    client: Client,
    /// Spell metadata, absent until loaded
    schema: Arc<RwLock<Option<Arc<MagicSchema>>>>,
    /// Open documents managed by the server
    documents: Arc<RwLock<HashMap<Url, Document>>>,
    config: Arc<RwLock<ServerConfig>>,
    root_uri: Arc<RwLock<Option<Url>>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            schema: Arc::new(RwLock::new(None)),
            documents: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(RwLock::new(ServerConfig::default())),
            root_uri: Arc::new(RwLock::new(None)),
        }
    }

    fn schema(&self) -> Option<Arc<MagicSchema>> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn completion_options(&self, uri: &Url) -> completion::CompletionOptions {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        completion::CompletionOptions {
            tab_size: config.tab_size(),
            dialect: Dialect::for_uri(uri),
        }
    }

    /// Load the metadata file named by the configuration
    async fn initialize_schema(&self) {
        let path = {
            let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
            let root = self.root_uri.read().unwrap_or_else(PoisonError::into_inner);
            config.resolve_metadata_path(root.as_ref())
        };
        let Some(path) = path else {
            let message = "No metadata file configured; set metadataPath or MAGIC_METADATA";
            warn!("{}", message);
            self.client.show_message(MessageType::WARNING, message).await;
            return;
        };

        info!("Loading spell metadata from {}", path.display());
        match MagicSchema::load(&path).await {
            Ok(schema) => {
                for problem in schema.dangling_references() {
                    warn!("Metadata: {}", problem);
                }
                {
                    let mut schema_lock = self.schema.write().unwrap_or_else(PoisonError::into_inner);
                    *schema_lock = Some(Arc::new(schema));
                }

                info!("Spell metadata loaded successfully");
                self.client
                    .log_message(MessageType::INFO, "Spell metadata loaded successfully")
                    .await;
            }
            Err(e) => {
                let error_msg = format!("Failed to load spell metadata: {}", e);
                error!("{}", error_msg);
                self.client.show_message(MessageType::ERROR, error_msg).await;
            }
        }
    }

    /// Parse and store a document, then publish its diagnostics
    async fn update_document(&self, uri: Url, text: String) {
        let mut document = Document::new(text);
        if let Err(e) = document.parse() {
            debug!("YAML syntax error in {}: {}", uri, e);
        }
        let diagnostics = diagnostics::validate_document(&document);

        {
            let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
            documents.insert(uri.clone(), document);
        }

        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Initializing Magic spell language server");

        let config = match ServerConfig::from_initialization_options(params.initialization_options) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using defaults", e);
                ServerConfig::default()
            }
        };
        debug!(?config, "Server configuration");
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;

        #[allow(deprecated)]
        let root = params
            .workspace_folders
            .and_then(|folders| folders.into_iter().next())
            .map(|folder| folder.uri)
            .or(params.root_uri);
        *self.root_uri.write().unwrap_or_else(PoisonError::into_inner) = root;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        ":".to_string(),
                        " ".to_string(),
                        "-".to_string(),
                    ]),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: Default::default(),
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    will_save: None,
                    will_save_wait_until: None,
                    save: Some(SaveOptions::default().into()),
                })),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "magic-spell-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Magic spell language server initialized");
        self.client
            .log_message(MessageType::INFO, "Magic spell language server initialized")
            .await;

        self.initialize_schema().await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Magic spell language server");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("Document opened: {}", uri);
        self.update_document(uri, params.text_document.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("Document changed: {}", uri);

        // Full sync: the last change holds the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update_document(uri, change.text).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("Document saved: {}", uri);

        let diagnostics = {
            let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
            match documents.get(&uri) {
                Some(document) => diagnostics::validate_document(document),
                None => {
                    debug!("Document not found for validation: {}", uri);
                    return;
                }
            }
        };
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("Document closed: {}", uri);

        {
            let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
            documents.remove(&uri);
        }

        // Clear diagnostics for the closed document
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(schema) = self.schema() else {
            debug!("Spell metadata not loaded, no completions");
            return Ok(None);
        };
        let options = self.completion_options(&uri);

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let Some(document) = documents.get(&uri) else {
            debug!("Document not found for completion: {}", uri);
            return Ok(None);
        };
        Ok(completion::provide_completion(document, position, &schema, options))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(schema) = self.schema() else {
            return Ok(None);
        };
        let options = self.completion_options(&uri);

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let Some(document) = documents.get(&uri) else {
            return Ok(None);
        };
        Ok(hover::provide_hover(document, position, &schema, options))
    }
}
