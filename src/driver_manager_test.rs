#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_command_exists() {
        #[cfg(unix)]
        {
            assert!(WebDriverManager::command_exists("ls"));
            assert!(!WebDriverManager::command_exists(
                "nonexistent_command_12345"
            ));
        }

        #[cfg(windows)]
        {
            assert!(WebDriverManager::command_exists("cmd"));
            assert!(!WebDriverManager::command_exists(
                "nonexistent_command_12345"
            ));
        }
    }

    #[test]
    fn test_find_free_port() {
        let port = WebDriverManager::find_free_port(BrowserType::Chrome).unwrap();
        assert!(port > 0);
        assert!(!WebDriverManager::is_port_in_use(port));
    }

    #[test]
    fn test_is_port_in_use() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(WebDriverManager::is_port_in_use(port));

        drop(listener);
        assert!(!WebDriverManager::is_port_in_use(port));
    }

    #[tokio::test]
    async fn test_status_check_against_closed_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}", port);
        assert!(!WebDriverManager::is_driver_running(&url).await);
        assert!(!WebDriverManager::verify_driver_working(&url).await);
    }

    #[test]
    fn test_new_manager_is_empty() {
        let manager = WebDriverManager::new();
        assert_eq!(manager.managed_count(), 0);
        manager.stop_all();
        assert_eq!(manager.managed_count(), 0);
    }
}
