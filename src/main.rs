use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use oclchat::commands::ask::{self, AskArgs};
use oclchat::commands::config::{self, ConfigArgs};
use oclchat::commands::serve::{self, ServeArgs};
use oclchat::commands::tools::{self, ToolsArgs};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("OCLCHAT_GIT_SHA"),
    " ",
    env!("OCLCHAT_BUILD_TS"),
    ")"
);

const ROOT_HELP_EXAMPLES: &str = concat!(
    "Examples:\n",
    "  oclchat serve --listen 127.0.0.1:8000\n",
    "  oclchat ask --provider openai --model gpt-4o-mini \"Find the CIEL concept for malaria\"\n",
    "  oclchat tools --json\n",
    "  oclchat config check --profile staging\n",
    "  oclchat completion bash > ~/.local/share/bash-completion/completions/oclchat",
);

const ASK_HELP_EXAMPLES: &str = concat!(
    "Examples:\n",
    "  oclchat ask --model claude-sonnet-4-5 \"Which versions of CIEL exist?\"\n",
    "  echo \"Suggest mappings for fever\" | oclchat ask --provider openai --model gpt-4o-mini\n",
    "  oclchat ask --model gpt-4o-mini --tools search_concepts,match_concepts --dry-run \"fever\"",
);

#[derive(Debug, Parser)]
#[command(
    name = "oclchat",
    version = VERSION,
    about = "Chat with a language model over Open Concept Lab terminology",
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the chat web server")]
    Serve(ServeArgs),
    #[command(about = "Ask one question from the terminal", after_help = ASK_HELP_EXAMPLES)]
    Ask(AskArgs),
    #[command(about = "List the terminology tools")]
    Tools(ToolsArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "oclchat", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "oclchat", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "oclchat", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Ask(args) => ask::run(args).await,
        Commands::Tools(args) => tools::run(args),
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
