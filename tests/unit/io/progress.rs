//! Tests for stage progress reporting

#[cfg(test)]
mod tests {
    use anncollage::io::progress::ProgressReporter;

    // Tests a hidden reporter accepts every call without drawing
    // Verified by creating a bar regardless of the enabled flag
    #[test]
    fn test_hidden_reporter() {
        let mut reporter = ProgressReporter::hidden();

        reporter.start_stage("gather", 3);
        reporter.advance("a.png");
        reporter.finish_stage();
        reporter.advance("after finish");
    }

    // Tests an enabled reporter runs through consecutive stages
    // Verified by leaving the previous bar unfinished on restart
    #[test]
    fn test_enabled_stages() {
        let mut reporter = ProgressReporter::new(true);

        reporter.start_stage("gather", 2);
        reporter.advance("first");
        reporter.start_stage("create", 1);
        reporter.advance("second");
        reporter.finish_stage();
        reporter.finish_stage();
    }

    // Tests the default reporter draws and can be dropped mid-stage
    // Verified by skipping the finish on drop
    #[test]
    fn test_default_dropped_mid_stage() {
        let mut reporter = ProgressReporter::default();
        reporter.start_stage("gather", 2);
        reporter.advance("half");
        drop(reporter);
    }
}
