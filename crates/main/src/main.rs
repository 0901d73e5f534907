use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;

use profile_pdf::app::{App, ViewOutcome};
use profile_pdf::config::{Overrides, Settings};
use profile_pdf::document::ProfileDocument;
use profile_pdf::intake::{IntakeForm, SubmitIntent};
use profile_pdf::navigation::Notifier;
use profile_pdf::pdf::{Orientation, PageFormat};
use profile_pdf::record::Field;

/// Fill in a contact profile and export it as a one-page PDF.
///
/// Fonts must be present under `assets/fonts` next to the binary or inside the
/// `profile_pdf` crate, or be provided via the `PROFILE_PDF_FONTS_DIR`
/// environment variable.
#[derive(Parser)]
#[command(author, version, about = "Profile intake and PDF export")]
struct Cli {
    /// Directory holding the handoff store (defaults to the local data directory).
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Directory exported PDFs are written to.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory holding the Roboto font files.
    #[arg(long, global = true)]
    fonts_dir: Option<PathBuf>,

    /// Paper format of the exported page.
    #[arg(long, global = true, value_enum, default_value_t = Paper::A4)]
    paper: Paper,

    /// Lay the exported page out in landscape.
    #[arg(long, global = true)]
    landscape: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store a profile, then open it in the viewer.
    Submit(SubmitArgs),

    /// Show the stored profile.
    View {
        /// Export the profile to PDF after showing it.
        #[arg(long)]
        download: bool,
    },

    /// Forget the stored profile.
    Clear,
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    position: String,
    #[arg(long, default_value = "")]
    description: String,

    /// Download the PDF right away instead of only previewing it.
    #[arg(long)]
    download: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Paper {
    A4,
    Letter,
}

impl From<Paper> for PageFormat {
    fn from(paper: Paper) -> Self {
        match paper {
            Paper::A4 => PageFormat::A4,
            Paper::Letter => PageFormat::Letter,
        }
    }
}

struct Console;

impl Notifier for Console {
    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm(&mut self, message: &str) {
        println!("{message}");
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), profile_pdf::Error> {
    let settings = Settings::resolve(Overrides {
        store_dir: cli.store_dir,
        output_dir: cli.output_dir,
        fonts_dir: cli.fonts_dir,
        page_format: Some(cli.paper.into()),
        orientation: Some(if cli.landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }),
    })?;
    let mut app = App::new(settings, Console);

    match cli.command {
        Commands::Submit(args) => {
            let intent = if args.download {
                SubmitIntent::DirectDownload
            } else {
                SubmitIntent::Preview
            };
            let form = args.into_form();
            if let Some(outcome) = app.submit(&form, intent, present)? {
                report(&outcome);
            }
        }
        Commands::View { download } => {
            let outcome = app.view(download, present)?;
            report(&outcome);
        }
        Commands::Clear => {
            app.clear()?;
            println!("Stored profile cleared.");
        }
    }

    Ok(())
}

impl SubmitArgs {
    fn into_form(self) -> IntakeForm {
        let mut form = IntakeForm::new();
        form.update_field(Field::Name, self.name);
        form.update_field(Field::Email, self.email);
        form.update_field(Field::Phone, self.phone);
        form.update_field(Field::Position, self.position);
        form.update_field(Field::Description, self.description);
        form
    }
}

fn present(document: &ProfileDocument) {
    println!("{document}");
    println!();
}

fn report(outcome: &ViewOutcome) {
    if let Some(export) = &outcome.export {
        println!(
            "Generated {} ({} bytes)",
            export.location.display(),
            export.size
        );
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
