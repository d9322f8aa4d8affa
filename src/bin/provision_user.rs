//! Operator CLI: provision an IAM user into one of the pantry groups
//! (Shoppers or Viewers), mint access keys, and enroll a virtual MFA device.
//!
//! Usage: provision_user <username> <group>

use std::io::Write as _;

use anyhow::{bail, Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: provision_user <username> <group>");
        std::process::exit(1);
    }
    let (username, group) = (args[1].as_str(), args[2].as_str());

    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
    let iam = aws_sdk_iam::Client::new(&aws);

    // Create user, tolerating reruns
    match iam.create_user().user_name(username).send().await {
        Ok(_) => println!("Created user {username}"),
        Err(err)
            if err
                .as_service_error()
                .map(|e| e.is_entity_already_exists_exception())
                .unwrap_or(false) =>
        {
            println!("User '{username}' already exists, continuing...");
        }
        Err(err) => return Err(err).context("CreateUser failed"),
    }

    // Membership is what the decision function will later report
    match iam.add_user_to_group().group_name(group).user_name(username).send().await {
        Ok(_) => println!("Added user '{username}' to group '{group}'"),
        Err(err)
            if err
                .as_service_error()
                .map(|e| e.is_no_such_entity_exception())
                .unwrap_or(false) =>
        {
            bail!("Group '{group}' does not exist.");
        }
        Err(err) => return Err(err).context("AddUserToGroup failed"),
    }

    let keys_out = iam
        .create_access_key()
        .user_name(username)
        .send()
        .await
        .context("CreateAccessKey failed")?;
    let keys = keys_out.access_key().context("CreateAccessKey returned no key")?;
    println!("Generated access keys for '{username}'");

    // Virtual MFA device; the QR PNG lands in the current directory for scanning
    let mfa = iam
        .create_virtual_mfa_device()
        .virtual_mfa_device_name(username)
        .send()
        .await
        .context("CreateVirtualMfaDevice failed")?;
    let device = mfa.virtual_mfa_device().context("no virtual MFA device in response")?;
    let qr_path = format!("{username}_mfa.png");
    if let Some(png) = device.qr_code_png() {
        std::fs::write(&qr_path, png.as_ref()).with_context(|| format!("writing {qr_path}"))?;
        println!("MFA QR code written to {qr_path}");
    }

    // Two consecutive TOTP codes prove the device is enrolled
    let code1 = prompt("Enter first MFA code: ")?;
    let code2 = prompt("Enter second MFA code: ")?;
    iam.enable_mfa_device()
        .user_name(username)
        .serial_number(device.serial_number())
        .authentication_code1(code1.trim())
        .authentication_code2(code2.trim())
        .send()
        .await
        .context("EnableMfaDevice failed")?;
    println!("MFA enabled for user '{username}'");

    println!("\n=== Credentials ===");
    println!("Access Key ID: {}", keys.access_key_id());
    println!("Secret Access Key: {}", keys.secret_access_key());
    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{msg}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}
