/// 路径解析：把 `/`、`/目录`、`/目录/文件.扩展名` 形式的绝对路径
/// 归类成带类型的实体。这里只做语法上的切分，
/// 名字长度和字符集的校验由消费方（目录操作）负责。

/// 路径归类结果，名字部分直接借用输入字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass<'a> {
    /// 根目录 `/`
    Root,
    /// 一级目录 `/name`（也接受带尾斜杠的 `/name/`）
    Directory(&'a str),
    /// 二级文件 `/directory/name.extension`，没有点号时扩展名为空
    File {
        directory: &'a str,
        name: &'a str,
        extension: &'a str,
    },
    /// 不符合两级层次的路径
    Invalid,
}

/// 归类一条绝对路径。
/// 规则：先导 `/` 之后若无第二个 `/`，整段就是目录名；
/// 第二段按最后一个 `.` 切成文件名和扩展名；再多的段一律非法。
pub fn resolve(path: &str) -> PathClass<'_> {
    if path == "/" {
        return PathClass::Root;
    }
    let rest = match path.strip_prefix('/') {
        Some(rest) => rest,
        None => return PathClass::Invalid,
    };
    let mut segments = rest.splitn(2, '/');
    let directory = segments.next().unwrap();
    if directory.is_empty() {
        return PathClass::Invalid;
    }
    match segments.next() {
        // `/name` 或 `/name/`
        None | Some("") => PathClass::Directory(directory),
        // 第三段出现就超出了两级层次
        Some(file) if file.contains('/') => PathClass::Invalid,
        Some(file) => match file.rfind('.') {
            Some(dot) => PathClass::File {
                directory,
                name: &file[..dot],
                extension: &file[dot + 1..],
            },
            None => PathClass::File {
                directory,
                name: file,
                extension: "",
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_root() {
        assert_eq!(resolve("/"), PathClass::Root);
    }

    #[test]
    fn classifies_directories() {
        assert_eq!(resolve("/docs"), PathClass::Directory("docs"));
        assert_eq!(resolve("/docs/"), PathClass::Directory("docs"));
        // 一级段里的点号属于目录名本身
        assert_eq!(resolve("/a.b"), PathClass::Directory("a.b"));
        // 长度超限的名字在语法上仍是目录，由目录操作拒绝
        assert_eq!(
            resolve("/waytoolongname"),
            PathClass::Directory("waytoolongname")
        );
    }

    #[test]
    fn classifies_files() {
        assert_eq!(
            resolve("/docs/readme.txt"),
            PathClass::File {
                directory: "docs",
                name: "readme",
                extension: "txt"
            }
        );
        assert_eq!(
            resolve("/docs/readme"),
            PathClass::File {
                directory: "docs",
                name: "readme",
                extension: ""
            }
        );
        // 按最后一个点切分
        assert_eq!(
            resolve("/docs/a.b.c"),
            PathClass::File {
                directory: "docs",
                name: "a.b",
                extension: "c"
            }
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(resolve(""), PathClass::Invalid);
        assert_eq!(resolve("docs"), PathClass::Invalid);
        assert_eq!(resolve("//x"), PathClass::Invalid);
        assert_eq!(resolve("/a/b/c"), PathClass::Invalid);
    }
}
