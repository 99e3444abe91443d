use clap::Parser;
use stpa::{Component, Model, ProjectFile};
use tracing::instrument;

use super::{
    Paths,
    terminal::{self, Colorize},
};

#[derive(Debug, Default, Parser)]
#[command(about = "Print the control structure as a tree")]
pub struct Show {
    /// Include causal factors and their entries
    #[arg(long)]
    factors: bool,

    /// Leave out process models, as the diagram step without them does
    #[arg(long)]
    pm_step: bool,

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

impl Show {
    #[instrument(level = "debug", skip(paths))]
    pub fn run(self, paths: &Paths) -> anyhow::Result<()> {
        let model = paths.load_model()?;

        match self.output {
            OutputFormat::Pretty => self.output_pretty(&model),
            OutputFormat::Json => {
                let project = ProjectFile::from_model(&model);
                println!("{}", serde_json::to_string_pretty(&project)?);
            }
        }
        Ok(())
    }

    fn output_pretty(&self, model: &Model) {
        let Some(root) = model.structure().root() else {
            println!("{}", "Empty project (no control structure)".dim());
            return;
        };
        let width = terminal::terminal_width().unwrap_or(100);

        self.print_component(model, root, 0, width);

        println!();
        println!("{}", "Summary".dim());
        println!("  Components:  {}", model.structure().len());
        println!("  Connections: {}", model.structure().connections().len());
        println!("  Analysed:    {}", model.causal().len());
        println!(
            "  Constraints: {}",
            model.causal().safety_constraints().len()
        );
        println!("  Links:       {}", model.links().len());
    }

    fn print_component(&self, model: &Model, component: &Component, depth: usize, width: usize) {
        let indent = "  ".repeat(depth);
        let label = terminal::truncate(component.text(), width.saturating_sub(indent.len() + 24));
        let kind = format!("[{}]", component.component_type());
        let marker = if component.is_safety_critical() {
            format!(" {}", "safety critical".warning())
        } else {
            String::new()
        };
        println!("{indent}{label} {}{marker}", kind.info());

        if self.factors {
            if let Some(overlay) = model.causal().overlay(component.id()) {
                for factor in overlay.factors() {
                    let text = if factor.text().is_empty() {
                        "(no description)"
                    } else {
                        factor.text()
                    };
                    println!(
                        "{indent}  ↳ {} {}",
                        text,
                        format!("({} entries)", factor.entries().len()).dim()
                    );
                    for entry in factor.entries() {
                        let constraint = model.causal().constraint_text_for(entry.constraint());
                        let target = entry
                            .uca()
                            .map_or_else(|| "hazards".to_string(), |uca| format!("UCA {uca}"));
                        if constraint.is_empty() {
                            println!("{indent}      • {target}");
                        } else {
                            println!("{indent}      • {target}: {}", constraint.success());
                        }
                    }
                }
            }
        }

        for child in model
            .get_children(component.id(), self.pm_step)
            .unwrap_or_default()
        {
            self.print_component(model, child, depth + 1, width);
        }
    }
}
