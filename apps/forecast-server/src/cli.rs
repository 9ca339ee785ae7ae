use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "forecast-server",
    version,
    about = "Hourly weather forecast ingestion and query service"
)]
pub struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_all_interfaces_on_8000() {
        let args = Args::parse_from(["forecast-server"]);
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 8000);
        assert!(!args.print_openapi);

        let args = Args::parse_from(["forecast-server", "--port", "9100", "--print-openapi"]);
        assert_eq!(args.port, 9100);
        assert!(args.print_openapi);
    }
}
