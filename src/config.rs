/// The configuration parameters for the application.
///
/// These can either be passed on the command line, or pulled from environment variables.
/// The latter is preferred as environment variables are one of the recommended ways to
/// get configuration from Kubernetes Secrets in deployment.
///
/// For development convenience, these can also be read from a `.env` file in the working
/// directory where the application is started.
///
/// See `.env.sample` in the repository root for details.
#[derive(clap::Parser, Default)]
pub struct Config {
    /// The connection URL for the Postgres database this application should use.
    #[clap(long, env)]
    pub database_url: String,

    /// The HMAC signing and verification key used for the session and flash cookies.
    ///
    /// Anyone holding this key can forge a session for any user, so treat it like a password.
    #[clap(long, env)]
    pub hmac_key: String,

    #[clap(long, env, default_value = "8080")]
    pub port: u16,

    #[clap(long, env, default_value = "5")]
    pub max_connections: u32,
}
