//! Tera rendering engine: embedded templates with per-project overrides.
//!
//! | Output      | Template                        |
//! |-------------|---------------------------------|
//! | rule list   | `rules/rules.list.tera`         |
//! | module      | `modules/module.sgmodule.tera`  |
//!
//! Both include `shared/_header.tera`. A file with the same relative name
//! under the override directory replaces the embedded one. The icon index is
//! plain serde JSON (see [`crate::icon_index`]), not a template.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use surge_core::SourceFormat;
use surge_normalize::CanonicalEntry;
use tera::Tera;

use crate::context::ResourceContext;
use crate::error::RenderError;

const TPLS: &[(&str, &str)] = &[
    ("shared/_header.tera", include_str!("templates/_partials/header.tera")),
    ("rules/rules.list.tera", include_str!("templates/rules.list.tera")),
    (
        "modules/module.sgmodule.tera",
        include_str!("templates/module.sgmodule.tera"),
    ),
];

/// Project-local template override directory.
pub const TEMPLATE_DIR: &str = ".surge-sync/templates";

pub fn user_template_dir_at(root: &Path) -> PathBuf {
    root.join(TEMPLATE_DIR)
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    files.sort();
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

/// LF only, exactly one trailing newline.
pub(crate) fn finish(rendered: String) -> String {
    let mut text = rendered.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = text.trim_end_matches('\n').len();
    text.truncate(trimmed);
    text.push('\n');
    text
}

/// Which template a destination renders through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    RuleList,
    Module,
}

impl OutputKind {
    pub fn template_name(self) -> &'static str {
        match self {
            OutputKind::RuleList => "rules/rules.list.tera",
            OutputKind::Module => "modules/module.sgmodule.tera",
        }
    }

    /// Text output for a source format; images are written as raw bytes.
    pub fn for_format(format: SourceFormat) -> Option<OutputKind> {
        match format {
            SourceFormat::RuleList => Some(OutputKind::RuleList),
            SourceFormat::Module => Some(OutputKind::Module),
            SourceFormat::Image => None,
        }
    }
}

/// Tera templates plus overrides. Build once per run and share.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(TemplateEngine {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Embedded templates plus overrides from `<root>/.surge-sync/templates`.
    pub fn for_root(root: &Path) -> Result<Self, RenderError> {
        Self::new(Some(&user_template_dir_at(root)))
    }

    pub fn render_resource(
        &self,
        kind: OutputKind,
        ctx: &ResourceContext,
    ) -> Result<String, RenderError> {
        let rendered = self.tera.render(kind.template_name(), &ctx.to_tera_context()?)?;
        Ok(finish(rendered))
    }

    /// Final bytes for one destination.
    pub fn render_entries(
        &self,
        format: SourceFormat,
        destination: &Path,
        entries: &[CanonicalEntry],
        upstreams: Vec<String>,
        homepage: Option<String>,
    ) -> Result<Vec<u8>, RenderError> {
        match OutputKind::for_format(format) {
            Some(kind) => {
                let ctx = ResourceContext::from_entries(destination, entries, upstreams, homepage);
                Ok(self.render_resource(kind, &ctx)?.into_bytes())
            }
            None => match entries {
                [CanonicalEntry::Icon(icon)] => Ok(icon.bytes.clone()),
                _ => Err(RenderError::IconShape {
                    destination: destination.to_path_buf(),
                    count: entries.len(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use surge_normalize::{ImageKind, IconEntry, ModuleBlock, RuleEntry};

    use super::*;

    fn rule(kind: &str, value: &str, policy: Option<&str>) -> CanonicalEntry {
        CanonicalEntry::Rule(RuleEntry {
            kind: kind.into(),
            value: value.into(),
            policy: policy.map(Into::into),
            options: vec![],
        })
    }

    #[test]
    fn engine_new_succeeds() {
        TemplateEngine::new(None).expect("embedded templates must parse");
    }

    #[test]
    fn rule_list_has_header_and_body() {
        let engine = TemplateEngine::new(None).unwrap();
        let out = engine
            .render_entries(
                SourceFormat::RuleList,
                Path::new("social/telegram.conf"),
                &[rule("DOMAIN", "t.me", Some("PROXY")), rule("IP-CIDR", "91.108.4.0/22", None)],
                vec!["https://example.com/Telegram.list".into()],
                Some("https://github.com/acme/conf".into()),
            )
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "#########################################\n\
             # telegram\n\
             # Entries: 2\n\
             # Upstream: https://example.com/Telegram.list\n\
             # Homepage: https://github.com/acme/conf\n\
             #########################################\n\
             \n\
             DOMAIN,t.me,PROXY\n\
             IP-CIDR,91.108.4.0/22\n"
        );
    }

    #[test]
    fn module_blocks_are_separated_by_blank_lines() {
        let engine = TemplateEngine::new(None).unwrap();
        let entries = [
            CanonicalEntry::Module(ModuleBlock {
                name: ModuleBlock::METADATA.into(),
                lines: vec!["#!name=Ads".into()],
            }),
            CanonicalEntry::Module(ModuleBlock {
                name: "Rule".into(),
                lines: vec!["DOMAIN,ad.com,REJECT".into()],
            }),
            CanonicalEntry::Module(ModuleBlock {
                name: "MITM".into(),
                lines: vec!["hostname = %APPEND% ad.com".into()],
            }),
        ];
        let out = engine
            .render_entries(SourceFormat::Module, Path::new("ads.sgmodule"), &entries, vec![], None)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let body = text.split("#########################################\n\n").nth(1).unwrap();
        assert_eq!(
            body,
            "#!name=Ads\n\n[Rule]\nDOMAIN,ad.com,REJECT\n\n[MITM]\nhostname = %APPEND% ad.com\n"
        );
        assert!(!text.contains("# Homepage"));
    }

    #[test]
    fn image_renders_raw_bytes() {
        let engine = TemplateEngine::new(None).unwrap();
        let icon = CanonicalEntry::Icon(IconEntry {
            name: "Apple".into(),
            kind: ImageKind::Png,
            bytes: b"\x89PNG\r\n\x1a\nrest".to_vec(),
            content_hash: String::new(),
        });
        let out = engine
            .render_entries(SourceFormat::Image, Path::new("apps/Apple.png"), &[icon], vec![], None)
            .unwrap();
        assert_eq!(out, b"\x89PNG\r\n\x1a\nrest");
    }

    #[test]
    fn image_without_icon_is_an_error() {
        let engine = TemplateEngine::new(None).unwrap();
        let err = engine
            .render_entries(SourceFormat::Image, Path::new("a.png"), &[], vec![], None)
            .unwrap_err();
        assert!(matches!(err, RenderError::IconShape { count: 0, .. }));
    }

    #[test]
    fn finish_normalizes_line_endings() {
        assert_eq!(finish("a\r\nb\r\n\n\n".into()), "a\nb\n");
    }
}
