use std::io::{self, IsTerminal, Read};

use clap::Args;
use serde_json::json;

use crate::agent::{MAX_TOOL_ROUNDS, ToolExecutor, build_conversation, run_turn};
use crate::llm::messages::ChatMessage;
use crate::llm::provider::build_chat_model;
use crate::ocl::OclClient;
use crate::settings::{LogFormat, Overrides, Settings};
use crate::telemetry;
use crate::toolbox::{OclToolbox, ToolKind, parse_tool_list};

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    /// Question to ask; read from stdin when omitted.
    pub prompt: Option<String>,
    #[arg(long, help = "Config profile to load")]
    pub profile: Option<String>,
    #[arg(long, help = "Model provider: anthropic, openai or fireworks")]
    pub provider: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, help = "Terminology server URL or alias (production, staging, local)")]
    pub ocl_url: Option<String>,
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
    #[arg(long, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub retries: Option<u32>,
    #[arg(long, help = "Initial retry delay in milliseconds")]
    pub retry_delay: Option<u64>,
    #[arg(long, value_delimiter = ',', help = "Comma-separated tool ids to enable")]
    pub tools: Vec<String>,
    #[arg(long, help = "Print the resolved request without calling the model")]
    pub dry_run: bool,
    #[arg(long, help = "Print the whole turn as JSON")]
    pub json: bool,
    #[arg(long, short)]
    pub verbose: bool,
}

impl AskArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            ocl_url: self.ocl_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            retries: self.retries,
            retry_delay: self.retry_delay,
        }
    }
}

pub async fn run(args: AskArgs) -> Result<(), String> {
    telemetry::init_tracing(LogFormat::Text, if args.verbose { "info" } else { "warn" });

    let settings = Settings::load(&args.overrides())?;
    let model_name = settings.require_model()?.to_string();
    let prompt = read_prompt(args.prompt.as_deref())?;
    let tools = if args.tools.is_empty() {
        ToolKind::ALL.to_vec()
    } else {
        parse_tool_list(&args.tools).map_err(|err| err.to_string())?
    };
    let messages = build_conversation(&[], &prompt);

    if args.verbose {
        eprintln!(
            "provider={} model={} ocl_url={} api_key_present={} ocl_token_present={} tools={}",
            settings.provider,
            model_name,
            settings.ocl_url,
            settings.api_key_present(),
            settings.ocl_token.is_some(),
            tools.len()
        );
    }

    if args.dry_run {
        let body = dry_run_body(&settings, &model_name, &tools, &messages, args.json);
        println!("{body}");
        return Ok(());
    }

    let api_key = settings.api_key.clone().unwrap_or_default();
    let model = build_chat_model(settings.provider, &model_name, &api_key, settings.options.clone())
        .map_err(|err| err.to_string())?;
    let client = OclClient::new(&settings.ocl_url, settings.ocl_token.clone())
        .map_err(|err| err.to_string())?;
    let toolbox = OclToolbox::new(client).with_enabled(tools);
    tracing::debug!(
        ocl_url = %toolbox.client().base_url(),
        tools = ?toolbox.enabled().map(ToolKind::id).collect::<Vec<_>>(),
        definitions = toolbox.definitions().len(),
        "toolbox ready"
    );

    let turn = run_turn(model.as_ref(), &toolbox, messages)
        .await
        .map_err(|err| err.to_string())?;

    if args.verbose {
        for run in &turn.tool_calls {
            eprintln!(
                "tool: {} error={} output_chars={}",
                run.name,
                run.is_error,
                run.output.chars().count()
            );
        }
        eprintln!("rounds={} limit_reached={}", turn.rounds, turn.limit_reached);
    }

    if args.json {
        let body = serde_json::to_string(&turn)
            .map_err(|err| format!("Failed to serialize response: {err}"))?;
        println!("{body}");
    } else {
        println!("{}", turn.reply);
    }
    Ok(())
}

/// The argument wins; stdin is only read when no argument was given.
fn read_prompt(argument: Option<&str>) -> Result<String, String> {
    if let Some(prompt) = argument.filter(|prompt| !prompt.trim().is_empty()) {
        return Ok(prompt.to_string());
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err("No prompt provided. Pass it as an argument or pipe it on stdin.".to_string());
    }
    let mut buffer = String::new();
    stdin
        .lock()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("Failed to read prompt from stdin: {err}"))?;
    let prompt = buffer.trim_end_matches(['\r', '\n']);
    if prompt.trim().is_empty() {
        return Err("No prompt provided. Pass it as an argument or pipe it on stdin.".to_string());
    }
    Ok(prompt.to_string())
}

fn dry_run_body(
    settings: &Settings,
    model: &str,
    tools: &[ToolKind],
    messages: &[ChatMessage],
    json_output: bool,
) -> serde_json::Value {
    let options = &settings.options;
    json!({
        "dry_run": true,
        "provider": settings.provider.as_str(),
        "model": model,
        "ocl_url": settings.ocl_url,
        "output": if json_output { "json" } else { "text" },
        "tools": tools.iter().map(|kind| kind.id()).collect::<Vec<_>>(),
        "messages": messages.iter().map(ChatMessage::to_json).collect::<Vec<_>>(),
        "request": {
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "timeout_secs": options.timeout_secs,
            "retries": options.retries,
            "retry_delay_ms": options.retry_delay_ms,
        },
        "max_tool_rounds": MAX_TOOL_ROUNDS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;
    use crate::llm::provider::Provider;

    #[test]
    fn dry_run_body_lists_tools_and_request_options() {
        let overrides = Overrides {
            provider: Some("openai".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            max_tokens: Some(128),
            ..Overrides::default()
        };
        let settings =
            Settings::resolve(&overrides, &|_| None, &ProfileConfig::default()).unwrap();
        assert_eq!(settings.provider, Provider::Openai);

        let messages = build_conversation(&[], "hello");
        let body = dry_run_body(
            &settings,
            "gpt-4o-mini",
            &[ToolKind::SearchConcepts],
            &messages,
            false,
        );
        assert_eq!(body["tools"], json!(["search_concepts"]));
        assert_eq!(body["request"]["max_tokens"], json!(128));
        assert_eq!(body["output"], json!("text"));
        assert_eq!(body["messages"][1]["content"], json!("hello"));
        assert_eq!(body["max_tool_rounds"], json!(MAX_TOOL_ROUNDS));
    }

    #[test]
    fn argument_prompt_is_used_verbatim() {
        assert_eq!(read_prompt(Some("2+2?")).unwrap(), "2+2?");
    }
}
