//! Playwright browser automation for the social app
//!
//! Builds a self-contained Playwright script per flow and runs it with
//! `node`, the same way the deployment's own browser suites drive the UI.
//! Flows are composed from the app's actual widgets: the create-account
//! wizard (with a custom server address), the post composer, replies,
//! likes, and the notifications tab.

use std::process::Stdio;

use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Configuration for browser flows
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Browser client URL, e.g. `https://social.local.example`
    pub base_url: String,
    /// Origin server host entered in the signup wizard
    pub pds_host: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "https://social.local.example".to_string(),
            pds_host: "pds.local.example".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Driver for browser flows against the social app
pub struct SocialAppDriver {
    config: BrowserConfig,
}

impl SocialAppDriver {
    /// Create a driver, verifying Playwright is available.
    pub fn new(config: BrowserConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    pub fn check_playwright_installed() -> E2eResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Start building a flow.
    pub fn flow(&self, name: impl Into<String>) -> FlowBuilder {
        FlowBuilder {
            name: name.into(),
            config: self.config.clone(),
            js: Vec::new(),
        }
    }
}

/// Composable browser flow; each step appends Playwright statements.
pub struct FlowBuilder {
    name: String,
    config: BrowserConfig,
    js: Vec<String>,
}

impl FlowBuilder {
    /// Navigate to the app's home page.
    pub fn goto_home(mut self) -> Self {
        self.js.push("await page.goto(baseUrl, { waitUntil: 'domcontentloaded' });".to_string());
        self
    }

    /// Walk the create-account wizard for `name` against the configured
    /// origin server, skipping the optional profile/interest steps.
    pub fn sign_up(mut self, name: &str) -> Self {
        let pds = js_str(&self.config.pds_host);
        let email = js_str(&format!("{name}@test.com"));
        let handle = js_str(name);
        self.js.push(format!(
            r#"await page.getByRole('button', {{ name: 'Create account' }}).click();
    await page.getByRole('button', {{ name: 'Bluesky Social' }}).click();
    await page.getByRole('radio', {{ name: 'Custom' }}).click();
    await page.getByRole('textbox', {{ name: 'Server address' }}).fill({pds});
    await page.getByRole('button', {{ name: 'Done' }}).click();
    await page.getByRole('textbox', {{ name: /enter.*email/i }}).fill({email});
    await page.getByRole('textbox', {{ name: /choose.*password/i }}).fill('TestPassword123!');
    await page.getByRole('button', {{ name: 'Next' }}).click();
    await page.getByRole('textbox', {{ name: new RegExp('\\.' + {pds}) }}).fill({handle});
    await page.getByRole('button', {{ name: 'Next' }}).click();
    await page.getByText('Give your profile a face').waitFor();
    await page.getByRole('button', {{ name: /continue|skip/i }}).click();
    await page.getByText('What are your interests?').waitFor();
    await page.getByRole('button', {{ name: /continue|skip/i }}).click();
    await page.getByRole('button', {{ name: /continue|skip/i }}).click();
    await page.getByText(/what.*hot/i).first().waitFor({{ timeout: 15000 }});"#
        ));
        self
    }

    /// Compose and submit a post.
    pub fn create_post(mut self, text: &str) -> Self {
        let text = js_str(text);
        self.js.push(format!(
            r#"await page.getByRole('button', {{ name: /compose.*post|new post/i }}).click();
    await page.getByRole('textbox', {{ name: 'Rich-Text Editor' }}).fill({text});
    await page.getByText('CancelPost').getByRole('button', {{ name: /post/i }}).click();"#
        ));
        self
    }

    /// Reply to the post whose text matches `post_text`.
    pub fn reply_to(mut self, post_text: &str, reply_text: &str) -> Self {
        let post = js_str(post_text);
        let reply = js_str(reply_text);
        self.js.push(format!(
            r#"await page.getByRole('link', {{ name: {post} }}).getByRole('button', {{ name: /reply/i }}).click();
    await page.getByRole('textbox', {{ name: 'Rich-Text Editor' }}).fill({reply});
    await page.getByText('CancelReply').getByRole('button', {{ name: /reply/i }}).click();"#
        ));
        self
    }

    /// Like the post whose text matches `post_text`.
    pub fn like(mut self, post_text: &str) -> Self {
        let post = js_str(post_text);
        self.js.push(format!(
            r#"await page.getByRole('link', {{ name: {post} }}).getByRole('button', {{ name: /like/i }}).click();"#
        ));
        self
    }

    /// Open the notifications tab.
    pub fn open_notifications(mut self) -> Self {
        self.js.push(
            r#"await page.getByRole('link', { name: /notifications/i }).click();"#.to_string(),
        );
        self
    }

    /// Reload the page.
    pub fn reload(mut self) -> Self {
        self.js.push("await page.reload();".to_string());
        self
    }

    /// Assert that `text` is visible.
    pub fn expect_text(mut self, text: &str) -> Self {
        let text = js_str(text);
        self.js
            .push(format!(r#"await page.getByText({text}).first().waitFor();"#));
        self
    }

    /// Build the complete Playwright script.
    pub fn build(&self) -> String {
        let mut script = format!(
            r#"const {{ chromium }} = require('playwright');

(async () => {{
  const browser = await chromium.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }},
    ignoreHTTPSErrors: true
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};

  try {{
"#,
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            base_url = js_str(&self.config.base_url),
        );

        for (i, step) in self.js.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}\n    {}\n", i + 1, step));
        }

        script.push_str(
            r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.error(JSON.stringify({ success: false, error: error.message }));
    process.exit(1);
  } finally {
    await browser.close();
  }
})();
"#,
        );
        script
    }

    /// Run the flow via `node`, failing on any step error.
    pub async fn run(&self) -> E2eResult<()> {
        let script = self.build();
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("flow.js");
        std::fs::write(&script_path, &script)?;

        debug!(flow = %self.name, path = %script_path.display(), "running browser flow");

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(E2eError::Playwright(format!(
                "flow '{}' failed:\nstdout: {}\nstderr: {}",
                self.name, stdout, stderr
            )));
        }

        info!(flow = %self.name, "browser flow passed");
        Ok(())
    }
}

/// Quote a string as a single-quoted JS literal.
fn js_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
