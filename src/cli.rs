use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::catalog::{
    resolve_option, AspectRatio, CatalogOption, BASE_OPTIONS, SCALE_OPTIONS, STYLE_OPTIONS,
};
use crate::figure::GenerationOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    pub image: Option<PathBuf>,
    pub options: GenerationOptions,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Generate(GenerateArgs),
    ListOptions,
    Help,
}

pub fn usage() -> &'static str {
    "Usage: nano_figure --image <path> [--scale <value|index>] [--style <value|index>] [--base <value|index>] [--aspect <1:1|3:4|4:3|16:9|9:16>] [--details <text>] [--out-dir <dir>]\n       nano_figure --list-options"
}

fn next_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing value for {flag}"))
}

fn catalog_value(options: &[CatalogOption], value: &str, flag: &str) -> Result<String> {
    resolve_option(options, value)
        .map(|value| value.to_string())
        .ok_or_else(|| anyhow!("Unknown {flag} value: {value} (see --list-options)"))
}

pub fn parse_args(args: &[String]) -> Result<CliCommand> {
    let mut image = None;
    let mut options = GenerationOptions::default();
    let mut out_dir = PathBuf::from(".");

    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--image" => {
                image = Some(PathBuf::from(next_value(args, &mut index, "--image")?));
            }
            "--scale" => {
                let value = next_value(args, &mut index, "--scale")?;
                options.scale = catalog_value(SCALE_OPTIONS, value, "--scale")?;
            }
            "--style" => {
                let value = next_value(args, &mut index, "--style")?;
                options.style = catalog_value(STYLE_OPTIONS, value, "--style")?;
            }
            "--base" => {
                let value = next_value(args, &mut index, "--base")?;
                options.base = catalog_value(BASE_OPTIONS, value, "--base")?;
            }
            "--aspect" => {
                let value = next_value(args, &mut index, "--aspect")?;
                options.aspect_ratio = value.parse::<AspectRatio>()?;
            }
            "--details" => {
                options.free_text = next_value(args, &mut index, "--details")?.to_string();
            }
            "--out-dir" => {
                out_dir = PathBuf::from(next_value(args, &mut index, "--out-dir")?);
            }
            "--list-options" => return Ok(CliCommand::ListOptions),
            "--help" | "-h" => return Ok(CliCommand::Help),
            other => {
                return Err(anyhow!("Unknown argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }

    Ok(CliCommand::Generate(GenerateArgs {
        image,
        options,
        out_dir,
    }))
}

pub fn render_catalogs() -> String {
    let mut output = String::new();
    for (title, options) in [
        ("Scale", SCALE_OPTIONS),
        ("Style", STYLE_OPTIONS),
        ("Base", BASE_OPTIONS),
    ] {
        output.push_str(&format!("{title}:\n"));
        for (index, option) in options.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} => {}\n",
                index + 1,
                option.label,
                option.value
            ));
        }
    }
    output.push_str("Aspect ratio:\n");
    for ratio in AspectRatio::ALL {
        output.push_str(&format!("  {} => {}\n", ratio.label(), ratio.as_str()));
    }
    output
}
