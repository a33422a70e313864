use std::{env, env::VarError};

use crate::{
    auth::{Role, TokenIssuer},
    config::AuthConfig,
};

/// The server takes its configuration from the environment. The only real command is `token`; anything else prints
/// the help text. Returns true if the process should exit instead of starting the server.
pub fn handle_command_line_args() -> bool {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => false,
        [cmd, subject] if cmd == "token" => {
            print_admin_token(subject);
            true
        },
        _ => {
            display_readme();
            display_envs();
            true
        },
    }
}

fn print_admin_token(subject: &str) {
    // A token signed with a throwaway secret would be useless, so the secret must be configured
    let auth = match AuthConfig::try_from_env() {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("Cannot issue a token. {e}");
            return;
        },
    };
    match TokenIssuer::new(&auth).issue_token(subject, vec![Role::Admin], None) {
        Ok(token) => println!("{token}"),
        Err(e) => eprintln!("Cannot issue a token. {e}"),
    }
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "HPP_HOST",
        "HPP_PORT",
        "HPP_DATABASE_URL",
        "HPP_USE_X_FORWARDED_FOR",
        "HPP_USE_FORWARDED",
        "HPP_GATEWAY_IP_WHITELIST",
        "HPP_GATEWAY_MERCHANT_ID",
        "HPP_GATEWAY_URL",
        "HPP_PUBLIC_BASE_URL",
        "HPP_GATEWAY_CURRENCY",
        "HPP_ENVIRONMENT",
        "HPP_REFERENCE_PREFIX",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
