use clap::{Parser, Subcommand, ValueEnum};
use docquery::config::DEFAULT_CONFIG_PATH;
use docquery::{
    CollectionService, CrudService, Document, FilterExpression, ImporterService,
    PaginationRequest, SqliteStore, StoreConfig,
};
use std::path::PathBuf;
use std::process;

/// docquery CLI - query and load document collections from the command line
#[derive(Parser)]
#[command(name = "docquery", version, about)]
struct Cli {
    /// Path to the store configuration file
    #[arg(long, env = "DOCQUERY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Count documents in a collection
    Count {
        /// Collection name
        collection: String,
    },

    /// List one page of a collection
    List {
        /// Collection name
        collection: String,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        per_page: Option<i64>,
        /// Sort field, prefix with '-' for descending (e.g. --sort=-store)
        #[arg(long, allow_hyphen_values = true)]
        sort: Option<String>,
        /// Filter expression as extended JSON (e.g. --filter '{"job":"X"}')
        #[arg(long)]
        filter: Option<String>,
        /// Prefix search across every field of the collection
        #[arg(long)]
        search: Option<String>,
    },

    /// Fetch documents by identifier
    ByIds {
        /// Collection name
        collection: String,
        /// Hex identifiers
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show the field names of a collection
    Headers {
        /// Collection name
        collection: String,
    },

    /// Replace the rows of a job with the contents of a CSV file
    Import {
        /// Collection name
        collection: String,
        /// CSV file with a header row
        csv: PathBuf,
        /// Job the rows belong to
        #[arg(long)]
        job: String,
    },

    /// Insert a single document
    Insert {
        /// Collection name
        collection: String,
        /// Field values (e.g. --field store=101)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Set fields on one document or on every match of a filter
    Update {
        /// Collection name
        collection: String,
        /// Document ID
        #[arg(long, conflicts_with = "filter", required_unless_present = "filter")]
        id: Option<String>,
        /// Filter expression as extended JSON
        #[arg(long)]
        filter: Option<String>,
        /// Field values to set (e.g. --field status=done)
        #[arg(long = "field", value_parser = parse_key_value, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Delete every document of a job
    RemoveJob {
        /// Collection name
        collection: String,
        /// Job name
        job: String,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::load(&cli.config)?;
    log::debug!("opening store {} ({})", config.path.display(), config.database);
    let store = SqliteStore::open(&config)?;

    match cli.command {
        Command::Count { collection } => {
            let count = CollectionService::new(store).collection_count(&collection)?;
            print_output(&serde_json::json!({ "count": count }), &cli.format)?;
        }

        Command::List {
            collection,
            page,
            per_page,
            sort,
            filter,
            search,
        } => {
            let request = PaginationRequest { page, per_page, sort };
            let filter = parse_filter(filter.as_deref())?;
            let service = CollectionService::new(store);
            let result = match search {
                Some(value) => service.quick_search(&collection, &value, &request, &filter)?,
                None => service.collection(&collection, &request, &filter)?,
            };
            print_output(&serde_json::to_value(&result)?, &cli.format)?;
        }

        Command::ByIds { collection, ids } => {
            let result = CollectionService::new(store).collection_by_ids(&collection, &ids)?;
            print_output(&serde_json::to_value(&result)?, &cli.format)?;
        }

        Command::Headers { collection } => {
            let headers = CollectionService::new(store).collection_headers(&collection)?;
            print_output(&serde_json::json!(headers), &cli.format)?;
        }

        Command::Import {
            collection,
            csv,
            job,
        } => {
            let imported = ImporterService::new(store).import(&collection, &csv, &job)?;
            print_output(
                &serde_json::json!({ "ok": true, "job": job, "imported": imported }),
                &cli.format,
            )?;
        }

        Command::Insert { collection, fields } => {
            let row = fields_to_document(&fields);
            let ids = CrudService::new(store).add_rows(&collection, vec![row])?;
            let ids: Vec<String> = ids.iter().map(|id| id.to_hex()).collect();
            print_output(&serde_json::json!({ "ids": ids }), &cli.format)?;
        }

        Command::Update {
            collection,
            id,
            filter,
            fields,
        } => {
            let service = CollectionService::new(store);
            let data = fields_to_document(&fields);
            let modified = match id {
                Some(id) => service.update_one(&collection, &id, &data)?,
                None => service.update_many(&collection, &parse_filter(filter.as_deref())?, &data)?,
            };
            print_output(
                &serde_json::json!({ "ok": true, "modified": modified }),
                &cli.format,
            )?;
        }

        Command::RemoveJob { collection, job } => {
            let removed = CollectionService::new(store).remove_all(&collection, &job)?;
            print_output(
                &serde_json::json!({ "ok": true, "job": job, "removed": removed }),
                &cli.format,
            )?;
        }
    }

    Ok(())
}

fn parse_filter(filter: Option<&str>) -> Result<FilterExpression, Box<dyn std::error::Error>> {
    match filter {
        Some(text) => {
            let json: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| format!("Invalid filter JSON '{text}': {e}"))?;
            Ok(FilterExpression::from_json(&json)?)
        }
        None => Ok(FilterExpression::new()),
    }
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn fields_to_document(fields: &[(String, String)]) -> Document {
    let mut doc = Document::new();
    for (key, val) in fields {
        // Numbers, booleans and arrays are kept typed; anything else is a string
        let json_val = serde_json::from_str(val).unwrap_or(serde_json::Value::String(val.clone()));
        doc.insert(key.clone(), json_val);
    }
    doc
}
