//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::handlers::{
    CcfRankHandler, DownloadHandler, ExtractTextHandler, ListDownloadsHandler, PdfLinkHandler,
    PublicationInfoHandler, QueryPlanHandler, SearchHandler,
};
use crate::app::AppContext;
use crate::models::Surface;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_on_arxiv")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Single search term or phrase. Boolean operators (AND/OR) are not supported."
            },
            "num_results": {
                "type": "integer",
                "description": "Maximum number of papers to return",
                "default": 100
            },
            "need_pdf_link": {
                "type": "boolean",
                "description": "Resolve PDF download links",
                "default": true
            },
            "need_datetime_sort": {
                "type": "boolean",
                "description": "Sort newest first before truncating",
                "default": false
            },
            "need_publication_info": {
                "type": "boolean",
                "description": "Attach DBLP venue and CCF rank to each paper",
                "default": false
            }
        },
        "required": ["query"]
    })
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with every tool bound to `app`
    pub fn new(app: Arc<AppContext>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register_tools(&app);
        registry
    }

    fn register_tools(&mut self, app: &Arc<AppContext>) {
        self.register(Tool {
            name: "search_on_arxiv".to_string(),
            description: "Search preprint papers on arXiv. Use simple keywords only, e.g. \
                \"machine learning\". Returns titles, first author, abstract, publish time and \
                optional PDF links."
                .to_string(),
            input_schema: search_schema(),
            handler: Arc::new(SearchHandler {
                app: app.clone(),
                surface: Surface::Preprint,
            }),
        });

        self.register(Tool {
            name: "search_on_venue".to_string(),
            description: "Search papers published at conferences and journals. Use simple \
                keywords only. Returns titles, first author, abstract, subjects, year and \
                optional PDF links."
                .to_string(),
            input_schema: search_schema(),
            handler: Arc::new(SearchHandler {
                app: app.clone(),
                surface: Surface::Venue,
            }),
        });

        self.register(Tool {
            name: "get_publication_info".to_string(),
            description: "Get publication venue, year and CCF rank for a paper from DBLP"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Paper title"
                    },
                    "author": {
                        "type": "string",
                        "description": "Author name to narrow the match"
                    }
                },
                "required": ["title"]
            }),
            handler: Arc::new(PublicationInfoHandler { app: app.clone() }),
        });

        self.register(Tool {
            name: "get_ccf_rank".to_string(),
            description: "Get the CCF rank of a conference or journal by abbreviation or full name"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "venue": {
                        "type": "string",
                        "description": "Venue abbreviation or full name (e.g., 'NeurIPS')"
                    }
                },
                "required": ["venue"]
            }),
            handler: Arc::new(CcfRankHandler { app: app.clone() }),
        });

        self.register(Tool {
            name: "get_paper_pdf_link".to_string(),
            description: "Get the PDF link of a paper from its papers.cool page (not the page link itself)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cool_paper_id": {
                        "type": "string",
                        "description": "Paper page URL as returned in the 'identifier' field"
                    }
                },
                "required": ["cool_paper_id"]
            }),
            handler: Arc::new(PdfLinkHandler { app: app.clone() }),
        });

        self.register(Tool {
            name: "download_paper_pdf".to_string(),
            description: "Download a paper PDF into the data directory. Returns the stored file name."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Paper title, used to name the file"
                    },
                    "pdf_link": {
                        "type": "string",
                        "description": "Absolute http(s) URL of the PDF"
                    }
                },
                "required": ["title", "pdf_link"]
            }),
            handler: Arc::new(DownloadHandler { app: app.clone() }),
        });

        self.register(Tool {
            name: "list_downloaded_papers".to_string(),
            description: "When you need to read a paper, first list all downloaded papers"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(ListDownloadsHandler { app: app.clone() }),
        });

        self.register(Tool {
            name: "extract_pdf_text".to_string(),
            description: "Extract text from a downloaded PDF. Accepts an absolute path, a path \
                relative to the working directory, or a stored file name."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pdf_path": {
                        "type": "string",
                        "description": "Path or stored file name of the PDF"
                    }
                },
                "required": ["pdf_path"]
            }),
            handler: Arc::new(ExtractTextHandler { app: app.clone() }),
        });

        self.register(Tool {
            name: "extract_academic_query".to_string(),
            description: "Progressively analyze a user's academic search intent and turn it into \
                search keywords, databases (arxiv, venue) and filters. All content in English."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "analysis_step": { "type": "string", "description": "Current step's content and reasoning" },
                    "step_number": { "type": "integer", "description": "Current step index" },
                    "total_steps": { "type": "integer", "description": "Estimated total steps" },
                    "next_step_needed": { "type": "boolean", "description": "Whether further analysis is required" },
                    "extracted_concepts": { "type": "array", "items": { "type": "string" } },
                    "databases": { "type": "string", "description": "arxiv or venue" },
                    "search_strategy": { "type": "string" },
                    "confidence_level": { "type": "number", "minimum": 0, "maximum": 1 },
                    "needs_clarification": { "type": "boolean", "default": false },
                    "clarification_questions": { "type": "array", "items": { "type": "string" } },
                    "date_range": { "type": "string", "enum": ["recent", "all"] },
                    "datetime_sort": { "type": "boolean", "default": false }
                },
                "required": ["analysis_step", "step_number", "total_steps", "next_step_needed"]
            }),
            handler: Arc::new(QueryPlanHandler),
        });
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args).await
    }
}
