use clap::Parser;
use stpa::domain::Prune;
use tracing::instrument;

use super::{Paths, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Discard stale causal data and dangling links")]
pub struct Clean {
    /// Also drop links with only one side set
    #[arg(long)]
    half_links: bool,

    /// Report what would be removed without rewriting the project
    #[arg(long)]
    dry_run: bool,
}

impl Clean {
    #[instrument(level = "debug", skip(paths))]
    pub fn run(self, paths: &Paths) -> anyhow::Result<()> {
        let mut model = paths.load_model()?;
        let constraints = model.causal().safety_constraints().len();

        let mode = if self.half_links {
            Prune::EitherNull
        } else {
            Prune::BothNull
        };
        let links = model.prune_links(mode);
        let purged = model.prepare_for_save();
        let dropped = constraints - model.causal().safety_constraints().len();

        if purged.is_empty() && links == 0 && dropped == 0 {
            println!("{}", "Nothing to clean".success());
            return Ok(());
        }

        for id in &purged {
            println!("  causal factors of deleted component {}", id.to_string().dim());
        }
        println!("  {links} dangling link(s)");
        println!("  {dropped} unreferenced safety constraint(s)");

        if self.dry_run {
            println!("{}", "Dry run: project left unchanged".warning());
        } else {
            model.save(&paths.project)?;
            println!("{}", format!("Cleaned {}", paths.project.display()).success());
        }
        Ok(())
    }
}
