mod test_control_without_grant;
mod test_remote_control;
