use clap::Parser;
use stpa::{Link, LinkType};
use tracing::instrument;
use uuid::Uuid;

use super::{Paths, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "List the links of a project")]
pub struct Links {
    /// Only list links of this category (e.g. UCA_HAZARD)
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_link_type)]
    link_type: Option<LinkType>,

    /// Only list links touching this id
    #[arg(long)]
    part: Option<Uuid>,

    /// Include half-built links
    #[arg(long)]
    all: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

/// Parses a link category, ignoring case.
fn parse_link_type(s: &str) -> Result<LinkType, String> {
    LinkType::ALL
        .into_iter()
        .find(|link_type| link_type.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| {
            let known: Vec<_> = LinkType::ALL.iter().map(|t| t.as_str()).collect();
            format!("unknown link type '{s}' (expected one of {})", known.join(", "))
        })
}

impl Links {
    #[instrument(level = "debug", skip(paths))]
    pub fn run(self, paths: &Paths) -> anyhow::Result<()> {
        let model = paths.load_model()?;

        let links: Vec<&Link> = model
            .links()
            .iter()
            .filter(|link| self.all || link.is_complete())
            .filter(|link| self.link_type.is_none_or(|t| t == link.link_type()))
            .filter(|link| self.part.is_none_or(|part| link.links(part)))
            .collect();

        match self.output {
            OutputFormat::Pretty => Self::output_pretty(&links),
            OutputFormat::Json => Self::output_json(&links)?,
        }
        Ok(())
    }

    fn output_pretty(links: &[&Link]) {
        if links.is_empty() {
            println!("{}", "No links found".dim());
            return;
        }

        let mut current = None;
        for link in links {
            if current != Some(link.link_type()) {
                current = Some(link.link_type());
                println!("{}", link.link_type().to_string().info());
            }
            let side = |side: Option<Uuid>| side.map_or_else(|| "-".warning(), |id| id.to_string());
            print!("  {} ↔ {}", side(link.a()), side(link.b()));
            if link.note().is_empty() {
                println!();
            } else {
                println!("  {}", link.note().dim());
            }
        }
        println!("\n{} link(s)", links.len());
    }

    fn output_json(links: &[&Link]) -> anyhow::Result<()> {
        let records: Vec<_> = links
            .iter()
            .map(|link| {
                serde_json::json!({
                    "id": link.id(),
                    "type": link.link_type(),
                    "a": link.a(),
                    "b": link.b(),
                    "note": link.note(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_types_parse_case_insensitively() {
        assert_eq!(parse_link_type("uca_hazard"), Ok(LinkType::UcaHazard));
        assert_eq!(
            parse_link_type("CAUSAL_ENTRY_CONSTRAINT"),
            Ok(LinkType::CausalEntryConstraint)
        );
        assert!(parse_link_type("parent").is_err());
    }
}
