use anyhow::Result;
use clap::Parser;
use rtc_gym::app::RtcGymApp;

fn main() -> Result<()> {
    let app = RtcGymApp::parse();

    app.run()?;

    Ok(())
}
