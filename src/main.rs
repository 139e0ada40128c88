use std::sync::Arc;

use clap::Parser;
use counsel_search::{
    ConfigDb,
    DataDir,
    IndexBuilder,
    IndexHandle,
    InvertedIndex,
    MessageDb,
    SearchConfig,
    SearchEngine,
    SearchOptions,
    SynonymTable,
    config_db,
    error,
    importer::{self, Corpus},
    index_builder::IndexStats,
    search,
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, ConfigAction};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("COUNSEL_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config_db = ConfigDb::open(&data_dir.config_db())?;

    match cli.command {
        Command::Import(args) => {
            let config = SearchConfig::load(&config_db)?;
            cmd_import(&data_dir, &config, &args)?;
        }
        Command::Rebuild(args) => {
            let mut config = SearchConfig::load(&config_db)?;
            if let Some(batch_size) = args.batch_size {
                config.apply(config_db::BATCH_SIZE, &batch_size.to_string())?;
            }
            cmd_rebuild(&data_dir, &config)?;
        }
        Command::Search(args) => {
            let mut config = SearchConfig::load(&config_db)?;
            if let Some(limit) = args.limit {
                config.apply(config_db::RESULT_LIMIT, &limit.to_string())?;
            }
            cmd_search(&data_dir, &config, &args)?;
        }
        Command::Status(args) => {
            cmd_status(&data_dir, args.json)?;
        }
        Command::Config { action } => match action {
            ConfigAction::Show { json } => config_show(&config_db, json)?,
            ConfigAction::Set { key, value } => {
                config_set(&config_db, &key, &value)?;
            }
            ConfigAction::Clear { key } => config_clear(&config_db, &key)?,
        },
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_import(
    data_dir: &DataDir,
    config: &SearchConfig,
    args: &cli::ImportArgs,
) -> error::Result<()> {
    let corpus = Corpus::from_file(&args.corpus)?;
    let summary = {
        let db = MessageDb::open(&data_dir.messages_db())?;
        importer::import_corpus(&db, &corpus)?
    };

    eprintln!(
        "Imported {} thread(s) and {} message(s)",
        summary.threads, summary.messages
    );
    if summary.orphaned > 0 {
        eprintln!(
            "Warning: {} message(s) reference threads that were never imported",
            summary.orphaned
        );
    }

    if args.rebuild {
        cmd_rebuild(data_dir, config)?;
    } else {
        eprintln!("Run `counsel-search rebuild` to make them searchable.");
    }
    Ok(())
}

fn cmd_rebuild(
    data_dir: &DataDir,
    config: &SearchConfig,
) -> error::Result<()> {
    let store = MessageDb::open(&data_dir.messages_db())?;
    let target = data_dir.index_path()?;

    eprintln!("Rebuilding search index...");
    let stats =
        IndexBuilder::new(config.batch_size).rebuild(&store, &target)?;
    print_stats(&stats);
    eprintln!("Rebuild complete.");
    Ok(())
}

fn print_stats(stats: &IndexStats) {
    eprintln!("  Messages scanned: {}", stats.messages_scanned);
    eprintln!("  Unique terms: {}", stats.unique_terms);
    eprintln!("  Total postings: {}", stats.total_postings);
    if !stats.top_terms.is_empty() {
        eprintln!("  Most common terms:");
        for (term, count) in &stats.top_terms {
            eprintln!("    {term}: {count}");
        }
    }
}

/// Wire the engine's collaborators once, from persisted settings.
fn bootstrap_engine(
    data_dir: &DataDir,
    config: &SearchConfig,
) -> error::Result<SearchEngine> {
    let synonyms = match &config.synonyms_file {
        Some(path) => SynonymTable::builtin_with_file(path)?,
        None => SynonymTable::builtin(),
    };
    let index = IndexHandle::open(&data_dir.index_path()?);
    let store = MessageDb::open(&data_dir.messages_db())?;

    Ok(SearchEngine::new(
        Arc::new(index),
        Arc::new(synonyms),
        Arc::new(store),
        SearchOptions::from(config),
    ))
}

fn cmd_search(
    data_dir: &DataDir,
    config: &SearchConfig,
    args: &cli::SearchArgs,
) -> error::Result<()> {
    let engine = bootstrap_engine(data_dir, config)?;
    let response = engine.search(&args.query);

    if args.json {
        search::format_json(&response)?;
    } else {
        search::format_human(&response);
    }
    Ok(())
}

fn cmd_status(data_dir: &DataDir, json: bool) -> error::Result<()> {
    let message_count =
        MessageDb::open(&data_dir.messages_db())?.message_count()?;
    let index_path = data_dir.index_path()?;
    let index = InvertedIndex::load(&index_path);

    if json {
        let index_json = match &index {
            Ok(index) => serde_json::json!({
                "terms": index.len(),
                "postings": index.total_postings(),
                "topTerms": index.top_terms(10),
            }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let status = serde_json::json!({
            "dataDir": data_dir.root().display().to_string(),
            "messages": message_count,
            "indexPath": index_path.display().to_string(),
            "index": index_json,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Messages: {message_count}");
        println!("Index: {}", index_path.display());
        match &index {
            Ok(index) => {
                println!("  Terms: {}", index.len());
                println!("  Postings: {}", index.total_postings());
            }
            Err(e) => println!("  {e}"),
        }
    }
    Ok(())
}

fn config_show(config_db: &ConfigDb, json: bool) -> error::Result<()> {
    let config = SearchConfig::load(config_db)?;
    let synonyms_file = config
        .synonyms_file
        .as_ref()
        .map(|p| p.display().to_string());

    if json {
        let value = serde_json::json!({
            (config_db::EXPANSION_THRESHOLD): config.expansion_threshold,
            (config_db::RESULT_LIMIT): config.result_limit,
            (config_db::TIME_BUDGET_MS): config.time_budget.as_millis() as u64,
            (config_db::BATCH_SIZE): config.batch_size,
            (config_db::SYNONYMS_FILE): synonyms_file,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "{}: {}",
            config_db::EXPANSION_THRESHOLD,
            config.expansion_threshold
        );
        println!("{}: {}", config_db::RESULT_LIMIT, config.result_limit);
        println!(
            "{}: {}",
            config_db::TIME_BUDGET_MS,
            config.time_budget.as_millis()
        );
        println!("{}: {}", config_db::BATCH_SIZE, config.batch_size);
        println!(
            "{}: {}",
            config_db::SYNONYMS_FILE,
            synonyms_file.as_deref().unwrap_or("(builtin only)")
        );
    }
    Ok(())
}

fn config_set(
    config_db: &ConfigDb,
    key: &str,
    value: &str,
) -> error::Result<()> {
    // Validate before persisting so a bad value never reaches config.redb.
    let mut config = SearchConfig::load(config_db)?;
    config.apply(key, value)?;
    config_db.set_setting(key, value.trim())?;
    eprintln!("Set {key} = {}", value.trim());
    Ok(())
}

fn config_clear(config_db: &ConfigDb, key: &str) -> error::Result<()> {
    let Some(previous) = config_db.get_setting(key)? else {
        return Err(error::Error::NotFound {
            kind: "setting",
            name: key.to_string(),
        });
    };
    config_db.remove_setting(key)?;
    eprintln!("Cleared {key} (was {previous})");
    Ok(())
}
