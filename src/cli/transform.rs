//! The transform command.
//!
//! Reads text, replaces every URL a configured provider claims and writes
//! the result.

use std::fs;
use std::io::{Read, Write};

use crate::cli::args::Cli;
use crate::error::Result;
use crate::response::RenderOptions;
use crate::template::TemplateReference;
use crate::transform::OEmbed;

use super::CommandResult;

/// The transform command implementation.
pub struct TransformCommand<'a> {
    cli: &'a Cli,
}

impl<'a> TransformCommand<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self { cli }
    }

    /// Build the oEmbed context described by the arguments.
    pub fn context(&self) -> Result<OEmbed> {
        let mut oembed = OEmbed::with_defaults();

        if let Some(config) = &self.cli.config {
            oembed.register_yaml_file(config)?;
        }
        if let Some(root) = &self.cli.template_root {
            oembed.templates_mut().set_root(Some(root));
        }
        if let Some(processor) = &self.cli.processor {
            oembed.templates_mut().set_processor(Some(processor.as_str()))?;
        }

        Ok(oembed)
    }

    /// Transform `stdin` (or the input file) into `out`.
    pub fn execute(&self, stdin: &mut dyn Read, out: &mut dyn Write) -> Result<CommandResult> {
        let oembed = self.context()?;

        let text = match &self.cli.input {
            Some(path) => fs::read_to_string(path)?,
            None => {
                let mut text = String::new();
                stdin.read_to_string(&mut text)?;
                text
            }
        };

        let params: Vec<(&str, &str)> = self
            .cli
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let output = match &self.cli.template {
            Some(template) => {
                let reference = TemplateReference::new(template.as_str());
                oembed.transform_with(&text, self.cli.strict, &params, |response, _url| {
                    if response.provider().is_some() {
                        response.any(RenderOptions::Template(reference.clone()))?;
                    }
                    Ok(())
                })?
            }
            None => oembed.transform(&text, self.cli.strict, &params)?,
        };

        out.write_all(output.as_bytes())?;
        out.flush()?;
        Ok(CommandResult::success())
    }
}
