//! Interactive menu: capture from the webcam or a file, recognize, enroll, list.

use crate::config::Config;
use crate::{input, render};
use anyhow::{Context, Result};
use facerec_client::{EnrollmentRequest, RecognitionApiClient, RecognitionRequest};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CaptureAndRecognize,
    CaptureAndEnroll,
    ListEmployees,
    RecognizeFile,
    Quit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::CaptureAndRecognize),
            "2" => Some(MenuChoice::CaptureAndEnroll),
            "3" => Some(MenuChoice::ListEmployees),
            "4" => Some(MenuChoice::RecognizeFile),
            "5" | "q" | "quit" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

type Input = Lines<BufReader<Stdin>>;

/// Print `label`, then read one line. `None` on end of input.
async fn prompt(lines: &mut Input, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    let line = lines.next_line().await.context("failed to read stdin")?;
    Ok(line.map(|l| l.trim().to_string()))
}

fn print_menu() {
    println!("\n{}", render::rule());
    println!("  MAIN MENU");
    println!("{}", render::rule());
    println!("  1. Capture and test recognition");
    println!("  2. Capture and add an employee");
    println!("  3. List employees");
    println!("  4. Test with an existing image");
    println!("  5. Quit");
    println!("{}", render::rule());
}

pub async fn run(client: &RecognitionApiClient, config: &Config) -> Result<()> {
    println!("Checking connection to {}...", client.config().base_url());
    match tokio::time::timeout(REACHABILITY_TIMEOUT, client.service_info()).await {
        Ok(Ok(_)) => println!("API reachable"),
        Ok(Err(err)) => return Err(err).context("API unreachable"),
        Err(_) => anyhow::bail!(
            "API unreachable: no answer within {}s",
            REACHABILITY_TIMEOUT.as_secs()
        ),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu();
        let Some(line) = prompt(&mut lines, "\nChoose an option (1-5): ").await? else {
            break;
        };

        let outcome = match MenuChoice::parse(&line) {
            Some(MenuChoice::CaptureAndRecognize) => recognize(client, config, None).await,
            Some(MenuChoice::CaptureAndEnroll) => enroll(client, config, &mut lines).await,
            Some(MenuChoice::ListEmployees) => list(client).await,
            Some(MenuChoice::RecognizeFile) => {
                match prompt(&mut lines, "\nImage path (e.g. photo.jpg): ").await? {
                    Some(path) if !path.is_empty() => {
                        recognize(client, config, Some(PathBuf::from(path))).await
                    }
                    Some(_) => {
                        println!("An image path is required");
                        Ok(())
                    }
                    None => break,
                }
            }
            Some(MenuChoice::Quit) => break,
            None => {
                println!("\nInvalid option");
                Ok(())
            }
        };

        if let Err(err) = outcome {
            tracing::debug!(error = %format!("{err:#}"), "menu action failed");
            eprint!("\n{}", render::error(&err));
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

async fn recognize(
    client: &RecognitionApiClient,
    config: &Config,
    image: Option<PathBuf>,
) -> Result<()> {
    let image = input::acquire(image, config).await?;
    println!("\nSending image to the API...");
    let result = client.recognize(&RecognitionRequest::new(image.bytes)).await?;
    println!("\n{}", render::recognition(&result));
    Ok(())
}

async fn enroll(client: &RecognitionApiClient, config: &Config, lines: &mut Input) -> Result<()> {
    let Some(employee_id) = prompt(lines, "\nEmployee ID (e.g. EMP001): ").await? else {
        return Ok(());
    };
    if employee_id.is_empty() {
        println!("An employee ID is required");
        return Ok(());
    }
    let employee_name = prompt(lines, "Employee name (optional): ")
        .await?
        .unwrap_or_default();

    let image = input::capture_from_camera(config).await?;
    println!("\nAdding employee {employee_id}...");
    let request = EnrollmentRequest::new(employee_id, image.bytes).with_name(employee_name);
    let result = client.enroll_employee(&request).await?;
    println!("\n{}", render::enrollment(&result));
    Ok(())
}

async fn list(client: &RecognitionApiClient) -> Result<()> {
    let listing = client.list_employees().await?;
    println!("\nRegistered employees:\n{}", render::rule());
    println!("{}", render::listing(&listing));
    Ok(())
}
