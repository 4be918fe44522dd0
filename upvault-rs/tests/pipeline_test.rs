//! Library-level tests for whole migration runs over throwaway exports.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use upvault::migrate::{DryRunSink, NoProgress, SinkOperation};
use upvault::{LinkMode, Migration, MigrationConfig, MigrationReport};

/// Build an export from `(file name, content)` pairs plus attachment names.
fn create_export(root: &Path, notes: &[(&str, &str)], attachments: &[&str]) {
    fs::create_dir_all(root.join("Files")).unwrap();
    for (name, content) in notes {
        fs::write(root.join(name), content).unwrap();
    }
    for name in attachments {
        let path = root.join("Files").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("bytes of {}", name)).unwrap();
    }
}

/// Every file below `root`, keyed by relative path.
fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let pattern = root.join("**").join("*");
    glob::glob(&pattern.to_string_lossy())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .map(|path| {
            let bytes = fs::read(&path).unwrap();
            (path.strip_prefix(root).unwrap().to_path_buf(), bytes)
        })
        .collect()
}

fn sample_export(temp: &TempDir) -> PathBuf {
    let src = temp.path().join("export");
    create_export(
        &src,
        &[
            (
                "Project.md",
                "---\ntitle: Project\ncategories:\n  - Work/Projects/Active\n  - Personal\ncustom: [1, 2]\n---\n\
                 ![img](Files/photo%201.png)\n[[Other Note]]\n[Spec](Spec.md#Scope)\n",
            ),
            (
                "Other Note.md",
                "---\ncategories: [Reference]\n---\nBack to [[Project|the project]].\n\
                 ```\n[[Project]] ![x](Files/photo%201.png)\n```\n",
            ),
            ("Spec.md", "---\ncategories: [Work/Projects/Active]\n---\n# Scope\n"),
            ("Inbox.md", "Uncategorized with [[Nowhere]].\n"),
        ],
        &["photo 1.png"],
    );
    src
}

fn config(temp: &TempDir, source: &Path, base: &str) -> MigrationConfig {
    MigrationConfig {
        source_dir: source.to_path_buf(),
        base_dir: temp.path().join(base),
        ..Default::default()
    }
}

/// Report content that does not depend on where the output went.
fn comparable(report: &MigrationReport) -> MigrationReport {
    let mut report = report.clone();
    report.header.base_dir = String::new();
    report.header.simulated = false;
    report
}

mod properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_runs_are_byte_identical() {
        let temp = TempDir::new().unwrap();
        let src = sample_export(&temp);

        let mut first_cfg = config(&temp, &src, "first");
        first_cfg.convert_tags = true;
        first_cfg.link_mode = LinkMode::ToMarkdown;
        let mut second_cfg = first_cfg.clone();
        second_cfg.base_dir = temp.path().join("second");

        let first = Migration::new(first_cfg.clone()).run().unwrap();
        let second = Migration::new(second_cfg.clone()).run().unwrap();

        let first_tree = read_tree(&first_cfg.base_dir);
        assert!(!first_tree.is_empty());
        assert_eq!(first_tree, read_tree(&second_cfg.base_dir));
        assert_eq!(comparable(&first.report), comparable(&second.report));
    }

    #[test]
    fn dry_run_report_matches_commit_report() {
        let temp = TempDir::new().unwrap();
        let src = sample_export(&temp);

        let mut dry_cfg = config(&temp, &src, "vault");
        dry_cfg.dry_run = true;
        let mut sink = DryRunSink::new();
        let dry = Migration::new(dry_cfg.clone())
            .run_with(&mut sink, &mut NoProgress)
            .unwrap();
        assert!(!dry_cfg.base_dir.exists());

        let real = Migration::new(config(&temp, &src, "vault")).run().unwrap();

        assert!(dry.report.header.simulated);
        assert!(!real.report.header.simulated);
        assert_eq!(comparable(&dry.report), comparable(&real.report));

        // Every planned write matches what the real run put on disk
        for op in &sink.operations {
            if let SinkOperation::WriteNote { path, content } = op {
                assert_eq!(&fs::read_to_string(path).unwrap(), content);
            }
        }
    }

    #[test]
    fn fan_out_produces_one_copy_per_category() {
        let temp = TempDir::new().unwrap();
        let src = sample_export(&temp);
        let cfg = config(&temp, &src, "vault");
        let base = cfg.base_dir.clone();
        let outcome = Migration::new(cfg).run().unwrap();

        let project = outcome
            .report
            .notes
            .iter()
            .find(|n| n.note == "Project.md")
            .unwrap();
        let folders: Vec<&str> = project.destinations.iter().map(|d| d.folder.as_str()).collect();
        assert_eq!(folders, vec!["Work/Projects/Active", "Personal"]);

        assert!(base.join("Work/Projects/Active/Project.md").is_file());
        assert!(base.join("Personal/Project.md").is_file());
        assert!(base.join("Inbox.md").is_file());
        assert_eq!(outcome.report.summary.notes_written, 5);
    }

    #[test]
    fn fenced_code_survives_every_mode() {
        let fenced = "```\n[[Project]] ![x](Files/photo%201.png)\n```\n";
        for mode in [LinkMode::Preserve, LinkMode::ToMarkdown, LinkMode::ToWikilink] {
            let temp = TempDir::new().unwrap();
            let src = sample_export(&temp);
            let mut cfg = config(&temp, &src, "vault");
            cfg.link_mode = mode;
            let base = cfg.base_dir.clone();
            Migration::new(cfg).run().unwrap();

            let other = fs::read_to_string(base.join("Reference/Other Note.md")).unwrap();
            assert!(other.ends_with(fenced), "mode {} altered fenced code", mode);
        }
    }

    #[test]
    fn markdown_then_wikilink_restores_targets() {
        let temp = TempDir::new().unwrap();
        let src = sample_export(&temp);

        let mut to_md = config(&temp, &src, "markdown");
        to_md.link_mode = LinkMode::ToMarkdown;
        let md_base = to_md.base_dir.clone();
        Migration::new(to_md).run().unwrap();

        let converted = fs::read_to_string(md_base.join("Reference/Other Note.md")).unwrap();
        assert!(converted.starts_with("Back to [the project](../Work/Projects/Active/Project.md)."));

        // Feed the converted vault folder back in as a flat export
        let round = temp.path().join("round");
        create_export(&round, &[("Other Note.md", converted.as_str()), ("Project.md", "x")], &[]);
        let mut to_wiki = config(&temp, &round, "wiki");
        to_wiki.link_mode = LinkMode::ToWikilink;
        let wiki_base = to_wiki.base_dir.clone();
        Migration::new(to_wiki).run().unwrap();

        let restored = fs::read_to_string(wiki_base.join("Other Note.md")).unwrap();
        assert!(restored.starts_with("Back to [[Project|the project]]."));
    }

    #[test]
    fn tag_conversion_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let src = sample_export(&temp);
        let mut cfg = config(&temp, &src, "once");
        cfg.convert_tags = true;
        cfg.tag_prefix = "upnote/".to_string();
        let once = cfg.base_dir.clone();
        Migration::new(cfg.clone()).run().unwrap();

        // Migrate the migrated copy again; no tag may be added twice
        let again_src = temp.path().join("again-src");
        fs::create_dir_all(&again_src).unwrap();
        fs::copy(once.join("Personal/Project.md"), again_src.join("Project.md")).unwrap();
        cfg.source_dir = again_src;
        cfg.base_dir = temp.path().join("twice");
        let outcome = Migration::new(cfg.clone()).run().unwrap();

        assert_eq!(outcome.report.summary.tags_added, 0);
        assert_eq!(
            fs::read_to_string(once.join("Personal/Project.md")).unwrap(),
            fs::read_to_string(cfg.base_dir.join("Personal/Project.md")).unwrap()
        );
    }
}

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tags_image_and_preserved_wikilink() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("export");
        create_export(
            &src,
            &[(
                "Note.md",
                "---\ncategories: Work/Projects/Active\n---\n![img](Files/photo%201.png)\n[[Other Note]]\n",
            )],
            &["photo 1.png"],
        );

        let mut cfg = config(&temp, &src, "vault");
        cfg.convert_tags = true;
        cfg.tag_prefix = "upnote/".to_string();
        cfg.link_mode = LinkMode::Preserve;
        let base = cfg.base_dir.clone();
        let outcome = Migration::new(cfg).run().unwrap();

        let text = fs::read_to_string(base.join("Work/Projects/Active/Note.md")).unwrap();
        assert_eq!(
            text,
            "---\ncategories: Work/Projects/Active\ntags:\n- upnote/work\n- upnote/projects\n- upnote/active\n---\n\
             ![img](<photo 1.png>)\n[[Other Note]]\n"
        );
        assert!(base.join("Work/Projects/Active/photo 1.png").is_file());

        let entry = &outcome.report.notes[0];
        assert_eq!(entry.tags_added, vec!["upnote/work", "upnote/projects", "upnote/active"]);
        assert_eq!(entry.unresolved_links.len(), 1);
        assert_eq!(entry.unresolved_links[0].target, "Other Note");
    }

    #[test]
    fn wikilink_alias_to_markdown() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("export");
        create_export(&src, &[("A.md", "[[Note|Alias]]\n"), ("Note.md", "target\n")], &[]);

        let mut cfg = config(&temp, &src, "vault");
        cfg.link_mode = LinkMode::ToMarkdown;
        let base = cfg.base_dir.clone();
        Migration::new(cfg).run().unwrap();

        assert_eq!(fs::read_to_string(base.join("A.md")).unwrap(), "[Alias](Note.md)\n");
    }

    #[test]
    fn attachments_subfolder_per_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("export");
        create_export(
            &src,
            &[("N.md", "---\ncategories: [A, B/C]\n---\n[doc](Files/sub/report%20v2.pdf)\n")],
            &["sub/report v2.pdf"],
        );

        let mut cfg = config(&temp, &src, "vault");
        cfg.attachments_dir = "_attachments".to_string();
        let base = cfg.base_dir.clone();
        let outcome = Migration::new(cfg).run().unwrap();

        assert!(base.join("A/_attachments/sub/report v2.pdf").is_file());
        assert!(base.join("B/C/_attachments/sub/report v2.pdf").is_file());
        assert_eq!(
            fs::read_to_string(base.join("B/C/N.md")).unwrap(),
            "[doc](<_attachments/sub/report v2.pdf>)\n"
        );
        assert_eq!(outcome.report.summary.attachments_copied, 2);
        assert_eq!(outcome.report.summary.attachments_resolved, 1);
    }
}
