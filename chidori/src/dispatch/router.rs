use crate::subscriber::ThreadMode;

/// 单次投递的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// 在调用线程同步执行
    Invoke,
    MainThread,
    Background,
    Async,
}

/// 依据线程模式与调用方所处线程选择去向
///
/// 未配置主线程支持时不存在主线程：MainThread 处理器在投递线程同步执行。
pub fn route(mode: ThreadMode, on_main_thread: bool, has_main_thread: bool) -> Route {
    match mode {
        ThreadMode::PostThread => Route::Invoke,
        ThreadMode::MainThread if on_main_thread || !has_main_thread => Route::Invoke,
        ThreadMode::MainThread => Route::MainThread,
        ThreadMode::BackgroundThread if on_main_thread => Route::Background,
        ThreadMode::BackgroundThread => Route::Invoke,
        ThreadMode::Async => Route::Async,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_table() {
        use ThreadMode::*;

        let cases = [
            (PostThread, true, Route::Invoke),
            (PostThread, false, Route::Invoke),
            (MainThread, true, Route::Invoke),
            (MainThread, false, Route::MainThread),
            (BackgroundThread, true, Route::Background),
            (BackgroundThread, false, Route::Invoke),
            (Async, true, Route::Async),
            (Async, false, Route::Async),
        ];

        for (mode, on_main, expected) in cases {
            assert_eq!(route(mode, on_main, true), expected, "{mode:?} on_main={on_main}");
        }
    }

    #[test]
    fn main_thread_mode_runs_inline_without_main_thread_support() {
        assert_eq!(route(ThreadMode::MainThread, false, false), Route::Invoke);
    }
}
