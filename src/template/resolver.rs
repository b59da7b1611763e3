//! Template lookup and engine dispatch.
//!
//! # Resolution Order
//!
//! 1. `root/reference` (or `reference` verbatim when no root is set)
//! 2. `root/reference.<ext>` for each configured extension, in order
//! 3. The host-supplied [`TemplateLookup`], if one is installed
//!
//! Nothing is cached: every render resolves and reads the template again.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::{Bindings, TemplateProcessor, TemplateReference};
use crate::config::TemplateConfig;
use crate::error::{OEmbedError, Result};
use crate::format::Metadata;
use crate::response::Response;

/// Extensions tried, in order, when a reference does not name an existing file.
pub const DEFAULT_EXTENSIONS: &[&str] = &["html.erb", "erb", "rhtml", "erubis", "haml"];

/// A host-supplied template search strategy.
///
/// Consulted only after the file system lookup fails. Returning `Ok(None)`
/// means the host does not know the template either.
pub trait TemplateLookup: Send + Sync {
    /// Render `reference` with the given bindings, if the host can find it.
    fn render(&self, reference: &str, bindings: &Bindings<'_>) -> anyhow::Result<Option<String>>;
}

/// Resolves template references and renders them.
pub struct TemplateResolver {
    root: Option<PathBuf>,
    processor: Option<TemplateProcessor>,
    extensions: Vec<String>,
    prefer_erubis: bool,
    lookup: Option<Box<dyn TemplateLookup>>,
}

impl fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResolver")
            .field("root", &self.root)
            .field("processor", &self.processor)
            .field("extensions", &self.extensions)
            .field("prefer_erubis", &self.prefer_erubis)
            .field("lookup", &self.lookup.is_some())
            .finish()
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver {
    /// A resolver with no root, no forced processor and the default extensions.
    pub fn new() -> Self {
        Self {
            root: None,
            processor: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            prefer_erubis: false,
            lookup: None,
        }
    }

    /// Set (or clear) the directory references are resolved against.
    pub fn set_root(&mut self, root: Option<impl Into<PathBuf>>) {
        self.root = root.map(Into::into);
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Force a processor by tag (`"erb"`, `"erubis"`, `"haml"`), or clear it.
    pub fn set_processor(&mut self, tag: Option<&str>) -> Result<()> {
        self.processor = tag.map(str::parse::<TemplateProcessor>).transpose()?;
        Ok(())
    }

    /// Force a processor, or clear it.
    pub fn set_forced_processor(&mut self, processor: Option<TemplateProcessor>) {
        self.processor = processor;
    }

    pub fn processor(&self) -> Option<TemplateProcessor> {
        self.processor
    }

    /// Replace the extension fallback list.
    pub fn set_extensions<I, S>(&mut self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Use Erubis instead of Erb when nothing else selects an engine.
    pub fn set_prefer_erubis(&mut self, prefer: bool) {
        self.prefer_erubis = prefer;
    }

    /// Install a host lookup consulted when no file matches.
    pub fn set_lookup(&mut self, lookup: Option<Box<dyn TemplateLookup>>) {
        self.lookup = lookup;
    }

    /// Apply the `templates` section of a configuration document.
    pub fn configure(&mut self, config: &TemplateConfig) {
        if let Some(root) = &config.root {
            self.root = Some(root.clone());
        }
        if let Some(processor) = config.processor {
            self.processor = Some(processor);
        }
        if let Some(extensions) = &config.extensions {
            self.extensions = extensions.clone();
        }
    }

    /// Find the file a reference names.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let base = match &self.root {
            Some(root) => root.join(reference),
            None => PathBuf::from(reference),
        };
        if base.is_file() {
            return Ok(base);
        }

        for ext in &self.extensions {
            let mut candidate = base.clone().into_os_string();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            trace!("Trying template {}", candidate.display());
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(OEmbedError::TemplateNotFound {
            path: base.display().to_string(),
        })
    }

    /// Pick the engine for a resolved template file.
    pub fn select_processor(&self, reference: &TemplateReference, path: &Path) -> TemplateProcessor {
        if let Some(processor) = reference.processor.or(self.processor) {
            return processor;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.get(..4) {
            Some("haml") => TemplateProcessor::Haml,
            Some("erub") => TemplateProcessor::Erubis,
            _ if self.prefer_erubis => TemplateProcessor::Erubis,
            _ => TemplateProcessor::Erb,
        }
    }

    /// Render a template with the `url`, `data` and `response` bindings.
    ///
    /// The output is trimmed of trailing whitespace.
    pub fn render(
        &self,
        reference: &TemplateReference,
        url: &str,
        data: &Metadata,
        response: &Response<'_>,
    ) -> Result<String> {
        let bindings = Bindings {
            url,
            data,
            response,
        };

        let path = match self.resolve(&reference.path) {
            Ok(path) => path,
            Err(err @ OEmbedError::TemplateNotFound { .. }) => {
                let Some(lookup) = &self.lookup else {
                    return Err(err);
                };
                debug!("Asking host lookup for template {}", reference.path);
                let rendered = lookup
                    .render(&reference.path, &bindings)
                    .map_err(|e| OEmbedError::Template {
                        path: reference.path.clone(),
                        message: format!("{e:#}"),
                    })?;
                return match rendered {
                    Some(out) => Ok(out.trim_end().to_string()),
                    None => Err(err),
                };
            }
            Err(err) => return Err(err),
        };

        let source = std::fs::read_to_string(&path)?;
        let processor = self.select_processor(reference, &path);
        debug!("Rendering {} with {}", path.display(), processor);

        let out = processor
            .engine()
            .render(&source, &bindings)
            .map_err(|e| OEmbedError::Template {
                path: path.display().to_string(),
                message: format!("{e:#}"),
            })?;

        Ok(out.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn data() -> Metadata {
        json!({"type": "video", "url": "template!", "html": "<embed/>"})
            .as_object()
            .unwrap()
            .clone()
    }

    fn render_with(resolver: &TemplateResolver, reference: TemplateReference) -> Result<String> {
        let data = data();
        let response = Response::new(
            Some("test1".to_string()),
            "http://test1.net/foo",
            data.clone(),
            resolver,
        );
        resolver.render(&reference, "http://test1.net/foo", &data, &response)
    }

    fn fixtures() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("test.rhtml"), "<%= data[\"url\"] %> rhtml\n").unwrap();
        fs::write(temp.path().join("test.html.erb"), "<%= data.url %> erb\n\n").unwrap();
        fs::write(temp.path().join("test.haml"), "= data.url + \" haml\"\n").unwrap();
        fs::write(temp.path().join("test.erubis"), "<%== data.html %>\n").unwrap();
        temp
    }

    #[test]
    fn renders_relative_to_root_and_trims() {
        let temp = fixtures();
        let mut resolver = TemplateResolver::new();
        resolver.set_root(Some(temp.path()));

        assert_eq!(
            render_with(&resolver, "test.rhtml".into()).unwrap(),
            "template! rhtml"
        );
        assert_eq!(
            render_with(&resolver, "test.html.erb".into()).unwrap(),
            "template! erb"
        );
    }

    #[test]
    fn infers_engine_from_extension() {
        let temp = fixtures();
        let mut resolver = TemplateResolver::new();
        resolver.set_root(Some(temp.path()));

        assert_eq!(
            render_with(&resolver, "test.haml".into()).unwrap(),
            "template! haml"
        );
        assert_eq!(
            render_with(&resolver, "test.erubis".into()).unwrap(),
            "&lt;embed/&gt;"
        );
    }

    #[test]
    fn absolute_reference_without_root() {
        let temp = fixtures();
        let resolver = TemplateResolver::new();
        let path = temp.path().join("test.rhtml");

        let out = render_with(&resolver, path.to_string_lossy().into_owned().into()).unwrap();
        assert_eq!(out, "template! rhtml");
    }

    #[test]
    fn falls_back_through_extensions() {
        let temp = fixtures();
        let mut resolver = TemplateResolver::new();
        resolver.set_root(Some(temp.path()));

        let path = resolver.resolve("test").unwrap();
        assert_eq!(path, temp.path().join("test.html.erb"));

        resolver.set_extensions(["haml"]);
        let path = resolver.resolve("test").unwrap();
        assert_eq!(path, temp.path().join("test.haml"));
    }

    #[test]
    fn missing_template_is_not_found() {
        let temp = TempDir::new().unwrap();
        let mut resolver = TemplateResolver::new();
        resolver.set_root(Some(temp.path()));

        let err = render_with(&resolver, "does.not.exist".into()).unwrap_err();
        assert!(matches!(err, OEmbedError::TemplateNotFound { .. }));
    }

    #[test]
    fn processor_priority() {
        let mut resolver = TemplateResolver::new();
        let haml = Path::new("t.haml");
        let erb = Path::new("t.erb");

        assert_eq!(
            resolver.select_processor(&"t".into(), haml),
            TemplateProcessor::Haml
        );
        assert_eq!(resolver.select_processor(&"t".into(), erb), TemplateProcessor::Erb);

        resolver.set_prefer_erubis(true);
        assert_eq!(
            resolver.select_processor(&"t".into(), erb),
            TemplateProcessor::Erubis
        );

        resolver.set_processor(Some("erb")).unwrap();
        assert_eq!(
            resolver.select_processor(&"t".into(), haml),
            TemplateProcessor::Erb
        );

        let pinned = TemplateReference::new("t").with_processor(TemplateProcessor::Haml);
        assert_eq!(resolver.select_processor(&pinned, erb), TemplateProcessor::Haml);
    }

    #[test]
    fn forced_processor_overrides_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("test.rhtml"), "= data.url + \" haml\"\n").unwrap();
        let mut resolver = TemplateResolver::new();
        resolver.set_root(Some(temp.path()));
        resolver.set_processor(Some("haml")).unwrap();

        assert_eq!(
            render_with(&resolver, "test.rhtml".into()).unwrap(),
            "template! haml"
        );
    }

    #[test]
    fn invalid_processor_is_rejected() {
        let mut resolver = TemplateResolver::new();
        let err = resolver.set_processor(Some("mustache")).unwrap_err();
        assert!(matches!(err, OEmbedError::Configuration { .. }));
        assert_eq!(resolver.processor(), None);
    }

    struct HostLookup;

    impl TemplateLookup for HostLookup {
        fn render(
            &self,
            reference: &str,
            bindings: &Bindings<'_>,
        ) -> anyhow::Result<Option<String>> {
            if reference == "shared/video" {
                Ok(Some(format!("host {}\n", bindings.url)))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn host_lookup_is_consulted_after_files() {
        let mut resolver = TemplateResolver::new();
        resolver.set_lookup(Some(Box::new(HostLookup)));

        assert_eq!(
            render_with(&resolver, "shared/video".into()).unwrap(),
            "host http://test1.net/foo"
        );
        assert!(matches!(
            render_with(&resolver, "shared/photo".into()).unwrap_err(),
            OEmbedError::TemplateNotFound { .. }
        ));
    }

    #[test]
    fn configure_applies_template_section() {
        let mut resolver = TemplateResolver::new();
        resolver.configure(&TemplateConfig {
            root: Some(PathBuf::from("/srv/templates")),
            processor: Some(TemplateProcessor::Erubis),
            extensions: None,
        });

        assert_eq!(resolver.root(), Some(Path::new("/srv/templates")));
        assert_eq!(resolver.processor(), Some(TemplateProcessor::Erubis));
        assert_eq!(resolver.extensions().len(), DEFAULT_EXTENSIONS.len());
    }
}
