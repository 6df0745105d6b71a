mod test_capture_failures;
mod test_screen_share;
