//! Subcommand handlers.
//!
//! Every handler runs against an already migrated connection and performs the
//! one-shot legacy import before touching notes.

use crate::Commands;
use anyhow::{bail, Context, Result};
use floatynotey_core::db::Connection;
use floatynotey_core::migrate::markup::parse_markup;
use floatynotey_core::{
    derive_title, migrate_if_needed, CoreConfig, DeepLinkCodec, Node, NoteChanges, NoteRecord,
    NoteService, SqliteNoteStore, SqliteSettingsStore,
};
use std::io::Write;

pub fn dispatch(
    conn: &Connection,
    config: &CoreConfig,
    command: &Commands,
    out: &mut impl Write,
) -> Result<()> {
    let service = NoteService::new(SqliteNoteStore::try_new(conn)?);
    let settings = SqliteSettingsStore::try_new(conn)?;
    migrate_if_needed(service.store(), Some(&settings), service.clock().as_ref())
        .context("legacy migration failed")?;

    match command {
        Commands::List => print_list(&service.list_notes()?, out),
        Commands::Search { query } => print_list(&service.search_notes(query)?, out),
        Commands::New { text } => {
            let id = service.create_note(text.as_deref().map(document_from_lines))?;
            writeln!(out, "{id}")?;
            Ok(())
        }
        Commands::Show { id } => print_note(&require(&service, *id)?, out),
        Commands::Pin { id } => {
            let note = require(&service, *id)?;
            service.update_note(note.id, NoteChanges::pinned(!note.pinned))?;
            let state = if note.pinned { "unpinned" } else { "pinned" };
            writeln!(out, "{state} {}", note.id)?;
            Ok(())
        }
        Commands::Delete { id } => {
            service.delete_note(*id)?;
            writeln!(out, "deleted {id}")?;
            Ok(())
        }
        Commands::Link { id } => {
            let note = require(&service, *id)?;
            writeln!(out, "{}", codec(config)?.encode(note.id))?;
            Ok(())
        }
        Commands::Resolve { url } => {
            let Some(id) = codec(config)?.decode_url(url) else {
                bail!("`{url}` is not a note link");
            };
            print_note(&require(&service, id)?, out)
        }
        Commands::ImportLegacy { file } => {
            let markup = std::fs::read_to_string(file)
                .with_context(|| format!("cannot read `{}`", file.display()))?;
            let document = parse_markup(&markup);
            let id = service.create_note(Some(document))?;
            writeln!(out, "{id}")?;
            Ok(())
        }
    }
}

fn require(service: &NoteService<SqliteNoteStore<'_>>, id: i64) -> Result<NoteRecord> {
    match service.get_note(id)? {
        Some(note) => Ok(note),
        None => bail!("note {id} does not exist"),
    }
}

fn codec(config: &CoreConfig) -> Result<DeepLinkCodec> {
    DeepLinkCodec::new(&config.app_origin)
        .with_context(|| format!("invalid app origin `{}`", config.app_origin))
}

fn document_from_lines(text: &str) -> Node {
    let blocks = text
        .lines()
        .map(|line| {
            let inlines = if line.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(line)]
            };
            Node::paragraph(inlines)
        })
        .collect::<Vec<_>>();
    if blocks.is_empty() {
        Node::empty_document()
    } else {
        Node::doc(blocks)
    }
}

fn print_list(notes: &[NoteRecord], out: &mut impl Write) -> Result<()> {
    for note in notes {
        let pin = if note.pinned { "*" } else { " " };
        writeln!(out, "{pin} {:>5}  {}", note.id, derive_title(&note.content))?;
    }
    Ok(())
}

fn print_note(note: &NoteRecord, out: &mut impl Write) -> Result<()> {
    writeln!(out, "# {}", derive_title(&note.content))?;
    writeln!(
        out,
        "id={} pinned={} created={} modified={}",
        note.id, note.pinned, note.created, note.modified
    )?;
    writeln!(out)?;
    for block in &note.content.content {
        let mut line = String::new();
        block.collect_text(&mut line);
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::dispatch;
    use crate::Commands;
    use floatynotey_core::db::open_db_in_memory;
    use floatynotey_core::repo::settings_store::{LEGACY_CONTENT_KEY, MIGRATED_KEY};
    use floatynotey_core::{CoreConfig, SettingsStore, SqliteSettingsStore};
    use std::path::PathBuf;

    fn run(conn: &floatynotey_core::db::Connection, command: Commands) -> String {
        let mut out = Vec::new();
        dispatch(conn, &CoreConfig::default(), &command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn new_then_list_and_search() {
        let conn = open_db_in_memory().unwrap();
        let id = run(
            &conn,
            Commands::New {
                text: Some("Shopping list\nmilk".to_string()),
            },
        );
        assert_eq!(id.trim(), "1");

        let listed = run(&conn, Commands::List);
        assert!(listed.contains("Shopping list"));
        assert!(!listed.contains("milk"));

        assert!(run(
            &conn,
            Commands::Search {
                query: "shop".to_string()
            }
        )
        .contains("Shopping list"));
        assert!(run(
            &conn,
            Commands::Search {
                query: "xyz".to_string()
            }
        )
        .is_empty());
    }

    #[test]
    fn pin_toggles_and_link_resolves() {
        let conn = open_db_in_memory().unwrap();
        run(&conn, Commands::New { text: None });

        assert_eq!(run(&conn, Commands::Pin { id: 1 }).trim(), "pinned 1");
        assert_eq!(run(&conn, Commands::Pin { id: 1 }).trim(), "unpinned 1");

        let link = run(&conn, Commands::Link { id: 1 });
        assert_eq!(link.trim(), "http://localhost:3000/#note/1");
        let shown = run(
            &conn,
            Commands::Resolve {
                url: link.trim().to_string(),
            },
        );
        assert!(shown.starts_with("# Untitled"));
    }

    #[test]
    fn missing_notes_and_foreign_links_are_errors() {
        let conn = open_db_in_memory().unwrap();
        let config = CoreConfig::default();
        let mut out = Vec::new();
        assert!(dispatch(&conn, &config, &Commands::Show { id: 9 }, &mut out).is_err());
        assert!(dispatch(&conn, &config, &Commands::Delete { id: 9 }, &mut out).is_err());
        assert!(dispatch(
            &conn,
            &config,
            &Commands::Resolve {
                url: "http://example.com/#note/1".to_string()
            },
            &mut out
        )
        .is_err());
    }

    #[test]
    fn import_legacy_creates_note_from_markup() {
        let dir = tempfile::tempdir().unwrap();
        let file: PathBuf = dir.path().join("legacy.html");
        std::fs::write(&file, "<h1>Old notes</h1><p>kept</p>").unwrap();

        let conn = open_db_in_memory().unwrap();
        let id = run(&conn, Commands::ImportLegacy { file });
        let shown = run(
            &conn,
            Commands::Show {
                id: id.trim().parse().unwrap(),
            },
        );
        assert!(shown.starts_with("# Old notes"));
        assert!(shown.contains("kept"));
    }

    #[test]
    fn broken_legacy_markup_is_imported_and_commands_keep_working() {
        let conn = open_db_in_memory().unwrap();
        let settings = SqliteSettingsStore::try_new(&conn).unwrap();
        settings
            .set(LEGACY_CONTENT_KEY, "<p>x</p></span><p class=\"open")
            .unwrap();

        let listed = run(&conn, Commands::List);
        assert!(listed.contains("    1  x"), "{listed}");
        assert_eq!(settings.get(MIGRATED_KEY).unwrap().as_deref(), Some("1"));

        assert_eq!(run(&conn, Commands::New { text: None }).trim(), "2");
        assert_eq!(run(&conn, Commands::List).lines().count(), 2);
    }
}
