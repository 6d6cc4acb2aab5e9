mod common;

use common::{assert_consistent, create_with, fresh, read_all};
use mini_ufs::{disk::BLOCK_SIZE, fs::config::MAX_FILE_SIZE, ErrorKind, FileSystemError};

#[test]
fn exactly_three_blocks_fit_one_more_byte_does_not() {
    let mut fs = fresh();
    fs.create("max").unwrap();
    let h = fs.open("max").unwrap();
    fs.write(h, &[b'm'; MAX_FILE_SIZE]).unwrap();

    let desc = fs.stat("max").unwrap();
    let usage = fs.usage().unwrap();
    let err = fs.write(h, b"!").unwrap_err();
    assert!(matches!(err, FileSystemError::FileTooLarge { .. }));
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert_eq!(fs.stat("max").unwrap(), desc);
    assert_eq!(fs.usage().unwrap(), usage);

    fs.close(h).unwrap();
    assert_eq!(read_all(&mut fs, "max"), vec![b'm'; MAX_FILE_SIZE]);
}

#[test]
fn oversized_single_write_is_rejected_up_front() {
    let mut fs = fresh();
    fs.create("f").unwrap();
    let h = fs.open("f").unwrap();
    let before = fs.usage().unwrap();

    assert!(fs.write(h, &[0; MAX_FILE_SIZE + 1]).is_err());
    assert_eq!(fs.stat("f").unwrap().length, 0);
    assert_eq!(fs.usage().unwrap(), before);
    assert_eq!(fs.position(h).unwrap(), 0);
}

#[test]
fn full_disk_rejects_growth_but_allows_overwrite() {
    let mut fs = fresh();
    let names: Vec<String> = (0..19).map(|i| format!("f{i}")).collect();
    for name in &names {
        fs.create(name).unwrap();
    }
    // 19 条目录项占 3 块，剩下 54 块正好装满 18 个满长文件
    for name in &names[..18] {
        let h = fs.open(name).unwrap();
        fs.write(h, &[b'#'; MAX_FILE_SIZE]).unwrap();
        fs.close(h).unwrap();
    }
    assert_eq!(fs.usage().unwrap().free_blocks, 0);

    let last = fs.open(&names[18]).unwrap();
    let err = fs.write(last, b"x").unwrap_err();
    assert!(matches!(err, FileSystemError::DiskFull { needed: 1, free: 0 }));
    assert_eq!(err.kind(), ErrorKind::Capacity);
    assert_eq!(fs.stat(&names[18]).unwrap().length, 0);
    assert_eq!(fs.stat(&names[18]).unwrap().allocated(), 0);

    let other = fs.open(&names[0]).unwrap();
    fs.seek(other, BLOCK_SIZE - 2).unwrap();
    fs.write(other, b"ok!!").unwrap();
    fs.close(other).unwrap();

    let content = read_all(&mut fs, &names[0]);
    assert_eq!(content.len(), MAX_FILE_SIZE);
    assert_eq!(&content[BLOCK_SIZE - 3..BLOCK_SIZE + 3], b"#ok!!#");
    assert_consistent(&mut fs);
}

#[test]
fn growth_resumes_after_space_is_freed() {
    let mut fs = fresh();
    let mut i = 0;
    loop {
        let name = format!("g{i}");
        fs.create(&name).unwrap();
        let h = fs.open(&name).unwrap();
        let result = fs.write(h, &[i as u8; MAX_FILE_SIZE]);
        fs.close(h).unwrap();
        if result.is_err() {
            break;
        }
        i += 1;
    }
    let stuck = format!("g{i}");
    assert_eq!(fs.stat(&stuck).unwrap().length, 0);

    fs.destroy("g0").unwrap();
    let h = fs.open(&stuck).unwrap();
    fs.write(h, &[0xEE; MAX_FILE_SIZE]).unwrap();
    fs.close(h).unwrap();
    assert_eq!(read_all(&mut fs, &stuck), vec![0xEE; MAX_FILE_SIZE]);
    assert_consistent(&mut fs);
}
