use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "vox")]
#[command(about = "Streaming chat client with MCP tools and voice output", long_about = None)]
pub struct Args {
    #[arg(short = 's', long = "server", help = "Tool gateway URL (streamable HTTP MCP endpoint)")]
    pub gateway_url: Option<String>,

    #[arg(short = 'm', long = "model", help = "Model name")]
    pub model: Option<String>,

    #[arg(
        long = "api-endpoint",
        help = "Inference API base URL (e.g. http://localhost:11434)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(long = "max-turns", help = "Maximum tool-use turns per response")]
    pub max_turns: Option<usize>,

    #[arg(long = "no-speech", help = "Disable text-to-speech output")]
    pub no_speech: bool,

    #[arg(short = 'v', long = "verbose", help = "Verbose diagnostics on stderr")]
    pub verbose: bool,
}
